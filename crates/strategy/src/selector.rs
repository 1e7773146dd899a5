//! The strategy selector and its decision table

use crate::structures::{build_butterfly, build_iron_condor, build_vertical_spread};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sextant_core::{
    Bias, ChainSnapshot, CompositeSignal, Direction, Instrument, Portfolio, Position,
    StrategyKind, StrategySlot, TradeAction, TradeProposal,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Volatility regime derived from the chain snapshot's implied vol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

/// Confidence band of a composite signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

/// Selector thresholds and exit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Minimum |score| to open a directional trade
    pub entry_threshold: Decimal,
    /// |score| below this closes an existing position
    pub exit_threshold: Decimal,
    /// Confidence at or above this is the High band
    pub high_confidence: Decimal,
    /// Confidence below this is the Low band (no entries)
    pub min_confidence: Decimal,
    /// Implied vol below this is the Low regime
    pub low_vol_threshold: Decimal,
    /// Implied vol above this is the High regime
    pub high_vol_threshold: Decimal,
    /// Strike search width around spot
    pub strike_width_pct: Decimal,
    /// Expiry window for options structures, in days
    pub min_days_to_expiry: i64,
    pub max_days_to_expiry: i64,
    /// Equity stop/target as fractions of entry when no ATR is available
    pub equity_stop_pct: Decimal,
    pub equity_target_pct: Decimal,
    /// ATR multiples for equity stop/target when the feed supplies ATR
    pub atr_stop_mult: Decimal,
    pub atr_target_mult: Decimal,
    /// Options stop/target as fractions of max loss / max profit
    pub options_stop_frac: Decimal,
    pub options_target_frac: Decimal,
    /// Wider exits used for high-confidence bullish entries
    pub confident_stop_frac: Decimal,
    pub confident_target_frac: Decimal,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            entry_threshold: dec!(0.3),
            exit_threshold: dec!(0.15),
            high_confidence: dec!(0.75),
            min_confidence: dec!(0.4),
            low_vol_threshold: dec!(0.20),
            high_vol_threshold: dec!(0.45),
            strike_width_pct: dec!(0.05),
            min_days_to_expiry: 30,
            max_days_to_expiry: 60,
            equity_stop_pct: dec!(0.05),
            equity_target_pct: dec!(0.15),
            atr_stop_mult: dec!(1.5),
            atr_target_mult: dec!(3.0),
            options_stop_frac: dec!(0.8),
            options_target_frac: dec!(0.5),
            confident_stop_frac: dec!(1.0),
            confident_target_frac: dec!(0.7),
        }
    }
}

impl SelectorConfig {
    pub fn regime(&self, chain: &ChainSnapshot) -> VolatilityRegime {
        if chain.implied_vol < self.low_vol_threshold {
            VolatilityRegime::Low
        } else if chain.implied_vol > self.high_vol_threshold {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        }
    }

    pub fn band(&self, confidence: Decimal) -> ConfidenceBand {
        if confidence >= self.high_confidence {
            ConfidenceBand::High
        } else if confidence >= self.min_confidence {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Pure decision table over (bias, confidence band, volatility regime).
///
/// Returns the strategy kind to attempt, or `None` when the inputs don't
/// justify a position.
pub fn choose_strategy(
    bias: Bias,
    band: ConfidenceBand,
    regime: VolatilityRegime,
) -> Option<StrategyKind> {
    match (bias, band, regime) {
        (_, ConfidenceBand::Low, _) => None,
        // High implied vol: defined-risk pinning structure regardless of band
        (Bias::Long | Bias::Short, _, VolatilityRegime::High) => Some(StrategyKind::Butterfly),
        (Bias::Long, ConfidenceBand::High, _) => Some(StrategyKind::Equity),
        (Bias::Short, ConfidenceBand::High, _) => Some(StrategyKind::Equity),
        (Bias::Long, ConfidenceBand::Medium, _) => Some(StrategyKind::BullCallSpread),
        (Bias::Short, ConfidenceBand::Medium, _) => Some(StrategyKind::BearPutSpread),
        // Range-bound, quiet market: collect premium
        (Bias::Neutral, _, VolatilityRegime::Low) => Some(StrategyKind::IronCondor),
        (Bias::Neutral, _, _) => None,
    }
}

/// Chooses a trade (or nothing) from a composite signal and market context
pub struct StrategySelector {
    config: SelectorConfig,
}

impl StrategySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Decide what, if anything, to do for this symbol this cycle.
    ///
    /// Inspects portfolio state read-only. Returns `None` when the signal
    /// is too weak, the slot is occupied, or the chain can't support the
    /// chosen structure.
    pub fn select(
        &self,
        composite: &CompositeSignal,
        chain: &ChainSnapshot,
        portfolio: &Portfolio,
    ) -> Option<TradeProposal> {
        // Signal-driven exit takes priority over any new entry
        if let Some(close) = self.signal_exit(composite, chain, portfolio) {
            return Some(close);
        }

        let band = self.config.band(composite.confidence);
        let regime = self.config.regime(chain);

        let directional_entry = composite.score.abs() >= self.config.entry_threshold;
        let condor_entry = composite.bias == Bias::Neutral
            && regime == VolatilityRegime::Low
            && band != ConfidenceBand::Low;
        if !directional_entry && !condor_entry {
            return None;
        }

        let kind = choose_strategy(composite.bias, band, regime)?;

        // One open position per (symbol, strategy slot)
        if portfolio.has_position(&composite.symbol, kind.slot()) {
            debug!(
                "[SELECT] {} slot {:?} occupied, skipping",
                composite.symbol,
                kind.slot()
            );
            return None;
        }

        match kind {
            StrategyKind::Equity => self.equity_proposal(composite, chain),
            _ => self.options_proposal(kind, composite, chain, band),
        }
    }

    /// Close the held position when its signal has decayed to noise
    fn signal_exit(
        &self,
        composite: &CompositeSignal,
        chain: &ChainSnapshot,
        portfolio: &Portfolio,
    ) -> Option<TradeProposal> {
        // A zero-confidence composite means no data this cycle, not a
        // decayed signal; holding is the right response to silence
        if composite.confidence.is_zero() {
            return None;
        }
        if composite.score.abs() >= self.config.exit_threshold {
            return None;
        }

        for slot in [StrategySlot::Equity, StrategySlot::Options] {
            if let Some(position) = portfolio.position(&composite.symbol, slot) {
                let mark = match &position.instrument {
                    Instrument::Equity => chain.spot,
                    Instrument::Options(s) => s.mark_value(chain)?,
                };
                return Some(self.close_proposal(position, mark, composite.clone()));
            }
        }
        None
    }

    fn close_proposal(
        &self,
        position: &Position,
        mark: Decimal,
        rationale: CompositeSignal,
    ) -> TradeProposal {
        let timestamp = rationale.timestamp;
        TradeProposal {
            id: Uuid::new_v4(),
            symbol: position.symbol.clone(),
            instrument: position.instrument.clone(),
            direction: position.direction,
            action: TradeAction::Close,
            quantity: position.quantity,
            entry_price: mark,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            rationale,
            timestamp,
        }
    }

    fn equity_proposal(
        &self,
        composite: &CompositeSignal,
        chain: &ChainSnapshot,
    ) -> Option<TradeProposal> {
        let entry = chain.spot;
        if entry <= Decimal::ZERO {
            return None;
        }

        let direction = match composite.bias {
            Bias::Long => Direction::Long,
            Bias::Short => Direction::Short,
            Bias::Neutral => return None,
        };

        // ATR bands when the feed supplies volatility, fixed percentages
        // otherwise
        let (stop_distance, target_distance) = match chain.atr {
            Some(atr) if atr > Decimal::ZERO => {
                (atr * self.config.atr_stop_mult, atr * self.config.atr_target_mult)
            }
            _ => (
                entry * self.config.equity_stop_pct,
                entry * self.config.equity_target_pct,
            ),
        };

        let (stop_loss, take_profit) = match direction {
            Direction::Long => (entry - stop_distance, entry + target_distance),
            Direction::Short => (entry + stop_distance, entry - target_distance),
        };
        if stop_loss <= Decimal::ZERO {
            return None;
        }

        Some(TradeProposal {
            id: Uuid::new_v4(),
            symbol: composite.symbol.clone(),
            instrument: Instrument::Equity,
            direction,
            action: TradeAction::Open,
            quantity: Decimal::ZERO,
            entry_price: entry,
            stop_loss,
            take_profit,
            rationale: composite.clone(),
            timestamp: composite.timestamp,
        })
    }

    fn options_proposal(
        &self,
        kind: StrategyKind,
        composite: &CompositeSignal,
        chain: &ChainSnapshot,
        band: ConfidenceBand,
    ) -> Option<TradeProposal> {
        let expiry = self.pick_expiry(composite, chain)?;
        let width = self.config.strike_width_pct;

        let structure = match kind {
            StrategyKind::BullCallSpread | StrategyKind::BearPutSpread => {
                build_vertical_spread(chain, expiry, kind, width)?
            }
            StrategyKind::IronCondor => build_iron_condor(chain, expiry, width)?,
            StrategyKind::Butterfly => build_butterfly(chain, expiry, width)?,
            StrategyKind::Equity => return None,
        };

        // Bullish high-confidence entries ride the full max-loss budget and
        // aim further; everything else exits earlier
        let confident = composite.bias == Bias::Long && band == ConfidenceBand::High;
        let (stop_frac, target_frac) = if confident {
            (self.config.confident_stop_frac, self.config.confident_target_frac)
        } else {
            (self.config.options_stop_frac, self.config.options_target_frac)
        };

        let per_share = sextant_core::CONTRACT_MULTIPLIER;
        let entry = structure.net_premium;
        let stop_loss = entry - stop_frac * structure.max_loss / per_share;
        let take_profit = entry + target_frac * structure.max_profit / per_share;

        Some(TradeProposal {
            id: Uuid::new_v4(),
            symbol: composite.symbol.clone(),
            instrument: Instrument::Options(structure),
            direction: Direction::Long,
            action: TradeAction::Open,
            quantity: Decimal::ZERO,
            entry_price: entry,
            stop_loss,
            take_profit,
            rationale: composite.clone(),
            timestamp: composite.timestamp,
        })
    }

    /// Nearest expiry inside the configured window
    fn pick_expiry(
        &self,
        composite: &CompositeSignal,
        chain: &ChainSnapshot,
    ) -> Option<chrono::NaiveDate> {
        let today = composite.timestamp.date_naive();
        chain.expiries.iter().copied().find(|expiry| {
            let days = (*expiry - today).num_days();
            days >= self.config.min_days_to_expiry && days <= self.config.max_days_to_expiry
        })
    }
}
