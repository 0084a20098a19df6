//! Core domain types and abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod stock;
pub mod valuation;

// Re-export main types for cleaner imports
pub use clock::{Clock, SystemClock};
pub use error::{
    MalformedPayloadError, ServiceError, StoreError, SyncError, SyncFailure, TransportError,
    ValuationError,
};
pub use stock::{StockRecord, StockStore};
pub use valuation::{Valuation, compute_valuation};
