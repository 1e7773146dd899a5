//! Signals - what providers emit and what the aggregator produces
//!
//! Providers (technical, options-flow, analyst-rating) emit normalized
//! `Signal`s per symbol per cycle. The aggregator folds them into one
//! `CompositeSignal` carrying the directional recommendation and a
//! per-source contribution breakdown for audit logging.

use crate::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSource {
    /// Indicator-based (RSI, moving averages, support/resistance)
    Technical,
    /// Options market activity (money flow, put/call ratio)
    OptionsFlow,
    /// Analyst recommendations and price targets
    AnalystRating,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Technical => "technical",
            SignalSource::OptionsFlow => "options-flow",
            SignalSource::AnalystRating => "analyst-rating",
        }
    }
}

/// A normalized signal from one source for one symbol
///
/// Immutable once produced; consumed within the cycle that fetched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Which provider produced this signal
    pub source: SignalSource,
    /// Instrument symbol
    pub symbol: String,
    /// Normalized score: -1 (max bearish) ..= +1 (max bullish)
    pub value: Decimal,
    /// Provider confidence in [0, 1]
    pub confidence: Decimal,
    /// When the signal was produced
    pub timestamp: Timestamp,
}

impl Signal {
    /// Create a new signal; value is clamped to [-1, 1], confidence to [0, 1]
    pub fn new(
        source: SignalSource,
        symbol: impl Into<String>,
        value: Decimal,
        confidence: Decimal,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            source,
            symbol: symbol.into(),
            value: value.clamp(-Decimal::ONE, Decimal::ONE),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
            timestamp,
        }
    }
}

/// Directional recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bias {
    Long,
    Short,
    #[default]
    Neutral,
}

impl Bias {
    pub fn is_directional(&self) -> bool {
        !matches!(self, Bias::Neutral)
    }
}

/// How one source contributed to a composite score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalContribution {
    pub source: SignalSource,
    pub value: Decimal,
    pub weight: Decimal,
    pub weighted_value: Decimal,
}

/// Aggregated view of all signals for one symbol in one cycle
///
/// Derived each cycle and not persisted beyond it, except through the
/// rationale fields copied onto trade records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSignal {
    pub symbol: String,
    /// Weighted average score in [-1, 1]
    pub score: Decimal,
    /// Directional recommendation; exactly zero score maps to Neutral
    pub bias: Bias,
    /// Combined confidence in [0, 1]
    pub confidence: Decimal,
    /// Per-source breakdown for audit
    pub contributions: Vec<SignalContribution>,
    pub timestamp: Timestamp,
}

impl CompositeSignal {
    /// The no-signal composite: zero score, zero confidence, neutral bias
    pub fn neutral(symbol: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            score: Decimal::ZERO,
            bias: Bias::Neutral,
            confidence: Decimal::ZERO,
            contributions: Vec::new(),
            timestamp,
        }
    }
}
