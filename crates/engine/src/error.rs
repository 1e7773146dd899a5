//! Engine errors
//!
//! Only faults that abort work live here. A risk rejection is control
//! flow, and missing data for one symbol degrades to a skip; neither is an
//! `EngineError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Clock skew or a missed window; the tick is skipped
    #[error("scheduling fault: {0}")]
    SchedulingFault(String),

    /// Invariant breach or other fatal portfolio failure
    #[error(transparent)]
    Portfolio(#[from] sextant_portfolio::PortfolioError),

    /// Durable store failure
    #[error(transparent)]
    Store(#[from] sextant_ports::StoreError),

    /// Provider failure that was not recoverable by skipping
    #[error(transparent)]
    Provider(#[from] sextant_ports::ProviderError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
