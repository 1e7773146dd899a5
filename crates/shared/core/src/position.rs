//! Open positions
//!
//! One shape for equity and options positions; the instrument variant
//! carries strategy-specific leg data. All prices here are per-unit (share
//! price for equity, per-share structure value for options); dollar P&L
//! applies the instrument's unit multiplier.

use crate::Timestamp;
use crate::instrument::{Direction, Instrument, StrategySlot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position, owned exclusively by the portfolio manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub instrument: Instrument,
    pub direction: Direction,
    /// Shares or contracts, always positive
    pub quantity: Decimal,
    /// Per-unit entry price
    pub entry_price: Decimal,
    pub entry_time: Timestamp,
    /// Per-unit stop level
    pub stop_loss: Decimal,
    /// Per-unit take-profit level
    pub take_profit: Decimal,
    /// Dollars lost if the stop triggers at its level
    pub capital_at_risk: Decimal,
}

impl Position {
    pub fn slot(&self) -> StrategySlot {
        self.instrument.slot()
    }

    /// Cash debited when the position was opened.
    ///
    /// Equity: notional at entry. Options: max-loss margin per contract,
    /// so the worst-case close can never drive cash negative.
    pub fn cost_basis(&self) -> Decimal {
        match &self.instrument {
            Instrument::Equity => self.quantity * self.entry_price,
            Instrument::Options(s) => self.quantity * s.max_loss,
        }
    }

    /// Dollar P&L at a per-unit mark price
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        self.direction.sign()
            * (mark - self.entry_price)
            * self.quantity
            * self.instrument.unit_multiplier()
    }

    /// Has the mark crossed the stop level?
    pub fn stop_breached(&self, mark: Decimal) -> bool {
        match self.direction {
            Direction::Long => mark <= self.stop_loss,
            Direction::Short => mark >= self.stop_loss,
        }
    }

    /// Has the mark reached the take-profit level?
    pub fn target_reached(&self, mark: Decimal) -> bool {
        match self.direction {
            Direction::Long => mark >= self.take_profit,
            Direction::Short => mark <= self.take_profit,
        }
    }

    /// A proposed stop only ratchets toward profit, never away from it
    pub fn stop_improves(&self, new_stop: Decimal) -> bool {
        match self.direction {
            Direction::Long => new_stop > self.stop_loss,
            Direction::Short => new_stop < self.stop_loss,
        }
    }
}
