//! Sextant Trading Engine
//!
//! The scheduler/orchestrator that drives the paper-trading cycle:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │  Signal Providers │ (technical / options-flow / analyst)
//!                  └────────┬─────────┘
//!                           │ signals per symbol
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Trading Engine                          │
//! │                                                             │
//! │  Idle ──► MarketOpenCheck ──► RunCycle ──► Idle             │
//! │                │ closed            │                        │
//! │                └── sleep           ▼  per symbol            │
//! │   Aggregator ──► Selector ──► Risk Manager ──► Portfolio    │
//! │                                    ▲               │        │
//! │                                    └── exit eval ──┘        │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ TradeRecords / snapshots
//!                            ▼
//!                     ┌─────────────┐
//!                     │ Trade Store │
//!                     └─────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - No proposal is generated and no risk check runs outside market hours.
//! - One cycle at a time: an overlapping start is refused as a no-op, not
//!   an error.
//! - Shutdown is honored between symbols, never mid-application; trade
//!   application is atomic.
//! - Snapshot reads go against the last fully-committed published state
//!   and never block on an in-progress cycle.
//! - A failure on one symbol is logged and skipped; the cycle continues.
//!   A portfolio invariant breach aborts the cycle and halts further
//!   application until cleared.

pub mod config;
pub mod engine;
pub mod error;
pub mod sim;
pub mod store;

// Re-export main types
pub use config::{ConfigError, EngineConfig};
pub use engine::{CycleOutcome, CycleReport, EngineState, TradingEngine};
pub use error::{EngineError, Result};
pub use sim::{SimulatedFeed, SimulatedFeedConfig};
pub use store::{JsonlTradeStore, NullTradeStore};
