//! Portfolio state
//!
//! The single authoritative aggregate of cash, open positions, and realized
//! P&L. All mutation goes through the portfolio manager; every other
//! component works against a cloned snapshot of this struct.

use crate::instrument::StrategySlot;
use crate::position::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of portfolio state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub initial_capital: Decimal,
    pub cash: Decimal,
    /// One active position per (symbol, strategy slot).
    ///
    /// Serialized as a position list; the key is recoverable from each
    /// position's symbol and slot.
    #[serde(with = "positions_serde")]
    pub positions: HashMap<(String, StrategySlot), Position>,
    /// Cumulative realized P&L across all closed trades
    pub realized_pnl: Decimal,
    /// Sum of capital-at-risk across open positions
    pub risk_consumed: Decimal,
}

mod positions_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &HashMap<(String, StrategySlot), Position>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut values: Vec<&Position> = map.values().collect();
        values.sort_by(|a, b| (&a.symbol, a.slot() as u8).cmp(&(&b.symbol, b.slot() as u8)));
        serializer.collect_seq(values)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<(String, StrategySlot), Position>, D::Error> {
        let values = Vec::<Position>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|p| ((p.symbol.clone(), p.slot()), p))
            .collect())
    }
}

impl Portfolio {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: HashMap::new(),
            realized_pnl: Decimal::ZERO,
            risk_consumed: Decimal::ZERO,
        }
    }

    pub fn position(&self, symbol: &str, slot: StrategySlot) -> Option<&Position> {
        self.positions.get(&(symbol.to_string(), slot))
    }

    pub fn has_position(&self, symbol: &str, slot: StrategySlot) -> bool {
        self.position(symbol, slot).is_some()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Book value: cash plus cost bases of open positions.
    ///
    /// Deterministic over the snapshot (no marks needed), which keeps risk
    /// sizing reproducible for replay.
    pub fn total_value(&self) -> Decimal {
        self.cash + self.positions.values().map(|p| p.cost_basis()).sum::<Decimal>()
    }

    /// Notional tied up in one symbol across slots, for concentration caps
    pub fn symbol_exposure(&self, symbol: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .map(|(_, p)| p.cost_basis())
            .sum()
    }

    /// No-manufactured-money audit: cash + cost bases never exceeds
    /// initial capital + realized P&L.
    pub fn invariants_hold(&self) -> bool {
        self.cash >= Decimal::ZERO && self.total_value() <= self.initial_capital + self.realized_pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Direction, Instrument};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn with_position() -> Portfolio {
        let mut portfolio = Portfolio::new(dec!(100000));
        let pos = Position {
            symbol: "AAPL".to_string(),
            instrument: Instrument::Equity,
            direction: Direction::Long,
            quantity: dec!(100),
            entry_price: dec!(50),
            entry_time: Utc::now(),
            stop_loss: dec!(47.50),
            take_profit: dec!(57.50),
            capital_at_risk: dec!(250),
        };
        portfolio.cash -= pos.cost_basis();
        portfolio.risk_consumed += pos.capital_at_risk;
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), pos);
        portfolio
    }

    #[test]
    fn test_total_value_is_book_value() {
        let portfolio = with_position();
        assert_eq!(portfolio.cash, dec!(95000));
        assert_eq!(portfolio.total_value(), dec!(100000));
    }

    #[test]
    fn test_slot_lookup() {
        let portfolio = with_position();
        assert!(portfolio.has_position("AAPL", StrategySlot::Equity));
        assert!(!portfolio.has_position("AAPL", StrategySlot::Options));
        assert!(!portfolio.has_position("MSFT", StrategySlot::Equity));
    }

    #[test]
    fn test_invariants_hold_on_fresh_and_funded() {
        assert!(Portfolio::new(dec!(100000)).invariants_hold());
        assert!(with_position().invariants_hold());
    }

    #[test]
    fn test_invariants_catch_manufactured_money() {
        let mut portfolio = with_position();
        portfolio.cash += dec!(1);
        assert!(!portfolio.invariants_hold());
    }

    #[test]
    fn test_serde_round_trip_rebuilds_position_keys() {
        let portfolio = with_position();
        let json = serde_json::to_string(&portfolio).unwrap();
        let restored: Portfolio = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.cash, portfolio.cash);
        assert!(restored.has_position("AAPL", StrategySlot::Equity));
        assert_eq!(
            restored
                .position("AAPL", StrategySlot::Equity)
                .unwrap()
                .quantity,
            dec!(100)
        );
    }
}
