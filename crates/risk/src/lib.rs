//! Risk Management
//!
//! Validates proposed trades against portfolio-level and position-level
//! risk budgets, computes position sizes, and enforces exit rules.
//!
//! ## Two paths
//!
//! ```text
//! Strategy Selector ──► TradeProposal ──► evaluate() ──► Accepted / Rejected
//!                                                             │
//! Portfolio snapshot ──► evaluate_exits() ──► Close / RaiseStop actions
//! ```
//!
//! `evaluate` sizes an entry from the configured risk-per-trade fraction
//! and the proposal's stop distance, then applies the vetoes: insufficient
//! cash, portfolio risk ceiling, concentration caps, quantity rounding to
//! zero. Each veto is a distinct rejection reason - a rejection is normal
//! control flow, not an error.
//!
//! `evaluate_exits` runs independently of new proposals. Stop-loss and
//! take-profit breaches close positions unconditionally: exit rules are
//! never risk-rejected, protecting capital always wins. It also enforces a
//! max-loss backstop and ratchets trailing stops on profitable equity
//! positions.
//!
//! Both paths are deterministic over (snapshot, inputs), which makes
//! decisions replayable after a crash.

mod manager;

pub use manager::{ExitAction, Rejection, RiskConfig, RiskDecision, RiskManager};
