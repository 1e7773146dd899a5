//! Portfolio Management
//!
//! The single writer of portfolio state. Every mutation - opening a
//! position, closing one, ratcheting a trailing stop - funnels through
//! [`PortfolioManager::apply`] and friends; every reader works against an
//! immutable [`sextant_core::Portfolio`] snapshot.
//!
//! ## Atomicity
//!
//! `apply` validates completely before mutating, so a trade is either
//! fully applied with a `TradeRecord` written, or not applied at all. A
//! post-apply invariant audit (no negative cash, no manufactured money)
//! trips the halt latch on violation: further trade application is refused
//! until the halt is manually cleared, since an invariant breach indicates
//! a logic defect rather than a market condition.
//!
//! ## Ledger and metrics
//!
//! Trade records are append-only with monotonically increasing ids.
//! Performance metrics (win rate, average return, max drawdown) are
//! maintained incrementally but defined by the ledger: recomputing them
//! from the full record log must reproduce the maintained values exactly,
//! and the tests hold the manager to that.

mod error;
mod manager;
mod metrics;

pub use error::{PortfolioError, Result};
pub use manager::PortfolioManager;
pub use metrics::PerformanceMetrics;
