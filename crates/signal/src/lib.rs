//! Signal Aggregation
//!
//! Combines heterogeneous per-symbol signals into one composite score and
//! directional recommendation per cycle.
//!
//! ## Weighting
//!
//! Each signal's weight is its provider confidence multiplied by a static
//! source-importance coefficient (technical > options-flow > analyst).
//! The composite score is the weighted average of the normalized values:
//!
//! ```text
//! score = Σ(value_i × confidence_i × coeff_i) / Σ(confidence_i × coeff_i)
//! ```
//!
//! ## Confidence and sparse data
//!
//! Composite confidence is the coefficient-weighted average of the source
//! confidences, scaled down by `reporting / min_sources` when fewer than
//! the configured minimum number of distinct sources report; in that case
//! the bias is also forced to neutral. No signals at all yields the
//! canonical neutral composite with confidence zero - absence of data is a
//! valid, common case, not an error.
//!
//! Aggregation is a pure function of its inputs, which keeps backtests
//! reproducible and the unit tests trivial to isolate.

mod aggregator;

pub use aggregator::{AggregatorConfig, SignalAggregator};
