//! Weighted-average signal aggregator

use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sextant_core::{Bias, CompositeSignal, Signal, SignalContribution, SignalSource, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for signal aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Source-importance coefficient for technical signals
    pub technical_coeff: Decimal,
    /// Source-importance coefficient for options-flow signals
    pub options_flow_coeff: Decimal,
    /// Source-importance coefficient for analyst-rating signals
    pub analyst_coeff: Decimal,
    /// Distinct sources required for full confidence and a directional bias
    pub min_sources: usize,
    /// Scores within ±band map to neutral
    pub neutral_band: Decimal,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            technical_coeff: dec!(1.0),
            options_flow_coeff: dec!(0.8),
            analyst_coeff: dec!(0.6),
            min_sources: 2,
            neutral_band: dec!(0.1),
        }
    }
}

impl AggregatorConfig {
    fn coefficient(&self, source: SignalSource) -> Decimal {
        match source {
            SignalSource::Technical => self.technical_coeff,
            SignalSource::OptionsFlow => self.options_flow_coeff,
            SignalSource::AnalystRating => self.analyst_coeff,
        }
    }
}

/// Combines per-symbol signals into a composite recommendation
///
/// Stateless between calls; `aggregate` is a pure function of its inputs.
pub struct SignalAggregator {
    config: AggregatorConfig,
}

impl SignalAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Combine one cycle's signals for a symbol into a composite.
    ///
    /// Signals for other symbols are ignored rather than rejected; the
    /// engine passes per-symbol batches but manual callers may not.
    pub fn aggregate(
        &self,
        symbol: &str,
        signals: &[Signal],
        timestamp: Timestamp,
    ) -> CompositeSignal {
        let relevant: Vec<&Signal> = signals.iter().filter(|s| s.symbol == symbol).collect();

        if relevant.is_empty() {
            return CompositeSignal::neutral(symbol, timestamp);
        }

        let mut weight_sum = Decimal::ZERO;
        let mut weighted_score = Decimal::ZERO;
        let mut coeff_sum = Decimal::ZERO;
        let mut weighted_confidence = Decimal::ZERO;
        let mut contributions = Vec::with_capacity(relevant.len());
        let mut sources: HashSet<SignalSource> = HashSet::new();

        for signal in &relevant {
            let coeff = self.config.coefficient(signal.source);
            let weight = signal.confidence * coeff;

            weight_sum += weight;
            weighted_score += signal.value * weight;
            coeff_sum += coeff;
            weighted_confidence += signal.confidence * coeff;
            sources.insert(signal.source);

            contributions.push(SignalContribution {
                source: signal.source,
                value: signal.value,
                weight,
                weighted_value: signal.value * weight,
            });
        }

        // All-zero weights (every source reported zero confidence) is the
        // same as no data
        if weight_sum.is_zero() {
            return CompositeSignal::neutral(symbol, timestamp);
        }

        let score = weighted_score / weight_sum;
        let mut confidence = weighted_confidence / coeff_sum;

        let sparse = sources.len() < self.config.min_sources;
        if sparse {
            let scale = Decimal::from(sources.len() as u64)
                / Decimal::from(self.config.min_sources as u64);
            confidence *= scale;
        }

        let bias = if sparse {
            Bias::Neutral
        } else if score > self.config.neutral_band {
            Bias::Long
        } else if score < -self.config.neutral_band {
            Bias::Short
        } else {
            Bias::Neutral
        };

        debug!(
            "[SIGNAL] {} score={} bias={:?} confidence={} sources={}",
            symbol,
            score,
            bias,
            confidence,
            sources.len()
        );

        CompositeSignal {
            symbol: symbol.to_string(),
            score,
            bias,
            confidence,
            contributions,
            timestamp,
        }
    }
}
