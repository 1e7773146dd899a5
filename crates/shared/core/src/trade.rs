//! Trade lifecycle types
//!
//! A `TradeProposal` is what the strategy selector emits; the risk manager
//! turns it into an `AcceptedTrade` (possibly resized) or rejects it; the
//! portfolio manager applies accepted trades and appends a `TradeRecord`
//! per execution. Records are append-only and carry monotonically
//! increasing ids, so crash recovery can replay them idempotently.

use crate::Timestamp;
use crate::instrument::{Direction, Instrument, StrategyKind};
use crate::signal::CompositeSignal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Open a new position or close an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Open,
    Close,
}

/// A trade the strategy selector wants to make
///
/// Created by the selector (or injected manually), consumed and possibly
/// resized by the risk manager. `quantity` is a request; the risk manager
/// owns the final size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeProposal {
    pub id: Uuid,
    pub symbol: String,
    pub instrument: Instrument,
    pub direction: Direction,
    pub action: TradeAction,
    /// Requested shares or contracts; zero lets the risk manager size it
    pub quantity: Decimal,
    /// Per-unit entry estimate (share price, or net premium per share)
    pub entry_price: Decimal,
    /// Per-unit stop level
    pub stop_loss: Decimal,
    /// Per-unit take-profit level
    pub take_profit: Decimal,
    /// The composite signal that motivated this proposal
    pub rationale: CompositeSignal,
    pub timestamp: Timestamp,
}

impl TradeProposal {
    /// Per-unit distance between entry and stop (always positive)
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Stop and target must bracket the entry on the correct sides
    pub fn exit_levels_valid(&self) -> bool {
        match self.direction {
            Direction::Long => {
                self.stop_loss < self.entry_price && self.entry_price < self.take_profit
            }
            Direction::Short => {
                self.take_profit < self.entry_price && self.entry_price < self.stop_loss
            }
        }
    }
}

/// A risk-approved trade, sized and ready to apply
///
/// Only the risk manager constructs these; the portfolio manager is the
/// only consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedTrade {
    pub proposal_id: Uuid,
    pub symbol: String,
    pub instrument: Instrument,
    pub direction: Direction,
    pub action: TradeAction,
    /// Final shares or contracts
    pub quantity: Decimal,
    /// Per-unit execution price
    pub price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Dollars lost if the stop triggers at its level
    pub capital_at_risk: Decimal,
    pub rationale: CompositeSignal,
    pub timestamp: Timestamp,
}

/// Append-only record of one executed trade (open or close)
///
/// Never mutated after creation; the durable history for analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Monotonically increasing identifier, assigned by the portfolio manager
    pub id: u64,
    pub timestamp: Timestamp,
    pub symbol: String,
    pub kind: StrategyKind,
    pub direction: Direction,
    pub action: TradeAction,
    pub quantity: Decimal,
    /// Per-unit execution price
    pub price: Decimal,
    /// Realized P&L; set on closes, `None` on opens
    pub pnl: Option<Decimal>,
    /// Composite score that motivated the trade
    pub rationale_score: Decimal,
    /// Composite confidence that motivated the trade
    pub rationale_confidence: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::CompositeSignal;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn proposal(direction: Direction, entry: Decimal, stop: Decimal, target: Decimal) -> TradeProposal {
        TradeProposal {
            id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            instrument: Instrument::Equity,
            direction,
            action: TradeAction::Open,
            quantity: Decimal::ZERO,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            rationale: CompositeSignal::neutral("AAPL", Utc::now()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_exit_levels_long() {
        let p = proposal(Direction::Long, dec!(100), dec!(95), dec!(115));
        assert!(p.exit_levels_valid());
        assert_eq!(p.stop_distance(), dec!(5));

        let inverted = proposal(Direction::Long, dec!(100), dec!(105), dec!(115));
        assert!(!inverted.exit_levels_valid());
    }

    #[test]
    fn test_exit_levels_short() {
        let p = proposal(Direction::Short, dec!(100), dec!(105), dec!(85));
        assert!(p.exit_levels_valid());

        let inverted = proposal(Direction::Short, dec!(100), dec!(95), dec!(115));
        assert!(!inverted.exit_levels_valid());
    }
}
