//! Cumulative performance metrics derived from the trade ledger

use rust_decimal::Decimal;
use sextant_core::{TradeAction, TradeRecord};
use serde::{Deserialize, Serialize};

/// Performance statistics over closed trades
///
/// Maintained incrementally by the portfolio manager; `recompute` from the
/// full ledger must always reproduce the same values (the consistency law).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Closed trades
    pub total_trades: u64,
    pub winning_trades: u64,
    /// Percentage of closed trades with positive P&L
    pub win_rate: Decimal,
    /// Average realized P&L per closed trade, in dollars
    pub avg_return: Decimal,
    /// Worst peak-to-trough decline of cumulative realized P&L, as a
    /// fraction of initial capital
    pub max_drawdown: Decimal,
    /// Cumulative realized P&L
    pub realized_pnl: Decimal,
    /// Highest cumulative realized P&L seen so far
    pub peak_pnl: Decimal,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            win_rate: Decimal::ZERO,
            avg_return: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            peak_pnl: Decimal::ZERO,
        }
    }

    /// Fold one record into the running statistics.
    ///
    /// Opens carry no P&L and leave the statistics untouched.
    pub fn record(&mut self, record: &TradeRecord, initial_capital: Decimal) {
        if record.action != TradeAction::Close {
            return;
        }
        let pnl = record.pnl.unwrap_or(Decimal::ZERO);

        self.total_trades += 1;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        }
        self.realized_pnl += pnl;

        if self.realized_pnl > self.peak_pnl {
            self.peak_pnl = self.realized_pnl;
        }
        if !initial_capital.is_zero() {
            let drawdown = (self.peak_pnl - self.realized_pnl) / initial_capital;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }

        let total = Decimal::from(self.total_trades);
        self.win_rate = Decimal::from(self.winning_trades) / total * Decimal::ONE_HUNDRED;
        self.avg_return = self.realized_pnl / total;
    }

    /// Rebuild the statistics from scratch out of the full ledger
    pub fn recompute(initial_capital: Decimal, ledger: &[TradeRecord]) -> Self {
        let mut metrics = Self::new();
        for record in ledger {
            metrics.record(record, initial_capital);
        }
        metrics
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
