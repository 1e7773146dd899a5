//! Strategy Selection
//!
//! Turns a composite signal plus options-chain context into a concrete
//! trade proposal - or nothing.
//!
//! ## Decision table
//!
//! Selection is a deterministic decision table keyed on (directional bias,
//! confidence band, volatility regime):
//!
//! ```text
//! bias        confidence   regime    choice
//! ----------  -----------  --------  ------------------------
//! Long/Short  high         low/norm  Equity (directional)
//! Long        medium       low/norm  Bull call spread
//! Short       medium       low/norm  Bear put spread
//! Long/Short  any          high      Butterfly
//! Neutral     >= floor     low       Iron condor
//! ```
//!
//! Identical inputs always produce the identical proposal. The selector
//! only inspects state - it never mutates the portfolio or market data -
//! and it refuses (returns `None`) rather than proposing a second position
//! for an occupied (symbol, slot).
//!
//! ## Exits
//!
//! When the signal for a held symbol decays below the exit threshold the
//! selector emits a close proposal instead of an entry. Stop-loss and
//! take-profit breaches are handled separately by the risk manager's exit
//! path; the selector's close is the signal-driven one.

mod selector;
mod structures;

pub use selector::{
    ConfidenceBand, SelectorConfig, StrategySelector, VolatilityRegime, choose_strategy,
};
pub use structures::{build_butterfly, build_iron_condor, build_vertical_spread};
