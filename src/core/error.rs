//! Error taxonomy for provider access, persistence and synchronization

use thiserror::Error;

/// A provider could not be reached or answered with a non-success status.
///
/// `endpoint` never contains the API key: for templated requests it is the
/// template with only the symbol substituted.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },
}

/// The provider answered successfully but the expected field was unusable.
#[derive(Debug, Error)]
#[error("malformed payload: {0}")]
pub struct MalformedPayloadError(pub String);

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("value of {shares_owned} shares at {close_price} is out of range")]
    Overflow {
        close_price: rust_decimal::Decimal,
        shares_owned: i64,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] fjall::Error),
    #[error("failed to encode stock record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a single symbol could not be synced.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayloadError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Error)]
#[error("failed to sync {symbol}: {cause}")]
pub struct SyncFailure {
    pub symbol: String,
    #[source]
    pub cause: SyncError,
}

impl SyncFailure {
    pub fn new(symbol: impl Into<String>, cause: impl Into<SyncError>) -> Self {
        Self {
            symbol: symbol.into(),
            cause: cause.into(),
        }
    }
}

/// Rejections at the stock write boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("shares owned must not be negative, got {0}")]
    NegativeShares(i64),
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("{0} is already tracked")]
    AlreadyTracked(String),
    #[error("{0} is not tracked")]
    NotFound(String),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Sync(#[from] SyncFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}
