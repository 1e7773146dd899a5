//! Portfolio manager errors

use sextant_core::StrategySlot;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    /// Trade application refused until the halt is cleared
    #[error("portfolio halted: {reason}")]
    Halted { reason: String },

    /// An invariant was violated; fatal for the current cycle
    #[error("state inconsistency: {reason}")]
    StateInconsistency { reason: String },

    #[error("no open position for {symbol} in slot {slot:?}")]
    UnknownPosition { symbol: String, slot: StrategySlot },

    #[error("position already open for {symbol} in slot {slot:?}")]
    DuplicatePosition { symbol: String, slot: StrategySlot },
}

pub type Result<T> = std::result::Result<T, PortfolioError>;
