//! Sextant Core Domain
//!
//! Pure domain types for the Sextant paper-trading engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod chain;
pub mod instrument;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod trade;

// Re-export commonly used types at crate root
pub use chain::{ChainSnapshot, OptionQuote};
pub use instrument::{
    CONTRACT_MULTIPLIER, Direction, Instrument, LegSide, OptionLeg, OptionType, OptionsStructure,
    StrategyKind, StrategySlot,
};
pub use portfolio::Portfolio;
pub use position::Position;
pub use signal::{Bias, CompositeSignal, Signal, SignalContribution, SignalSource};
pub use trade::{AcceptedTrade, TradeAction, TradeProposal, TradeRecord};

/// Timestamp used throughout the system
pub type Timestamp = chrono::DateTime<chrono::Utc>;
