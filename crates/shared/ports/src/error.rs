use thiserror::Error;

/// Errors from signal and market-data providers
///
/// `Unavailable` is the degrade-and-skip case: missing data for one symbol
/// in one cycle is common and never aborts the cycle.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("data unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("provider I/O failure: {0}")]
    Io(String),
}

impl ProviderError {
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors from the durable trade store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
