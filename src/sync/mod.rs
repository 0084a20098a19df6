//! Periodic and on-demand stock synchronization

pub mod engine;
pub mod report;
pub mod scheduler;

pub use engine::StockSyncEngine;
pub use report::SyncReport;
pub use scheduler::{Schedule, Scheduler};
