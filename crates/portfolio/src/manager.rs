//! The single-writer portfolio manager

use crate::error::{PortfolioError, Result};
use crate::metrics::PerformanceMetrics;
use log::{error, info};
use rust_decimal::Decimal;
use sextant_core::{
    AcceptedTrade, Direction, Portfolio, Position, StrategySlot, Timestamp, TradeAction,
    TradeRecord,
};

/// Owns the authoritative portfolio state and the append-only trade ledger
pub struct PortfolioManager {
    state: Portfolio,
    ledger: Vec<TradeRecord>,
    next_record_id: u64,
    metrics: PerformanceMetrics,
    /// Set when an invariant breach halted trade application
    halt_reason: Option<String>,
}

impl PortfolioManager {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            state: Portfolio::new(initial_capital),
            ledger: Vec::new(),
            next_record_id: 1,
            metrics: PerformanceMetrics::new(),
            halt_reason: None,
        }
    }

    /// Read-only snapshot of the current state
    pub fn snapshot(&self) -> Portfolio {
        self.state.clone()
    }

    /// Current performance statistics
    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }

    /// The full append-only trade ledger
    pub fn ledger(&self) -> &[TradeRecord] {
        &self.ledger
    }

    /// Records with timestamps in [from, to]
    pub fn trade_history(&self, from: Timestamp, to: Timestamp) -> Vec<TradeRecord> {
        self.ledger
            .iter()
            .filter(|r| r.timestamp >= from && r.timestamp <= to)
            .cloned()
            .collect()
    }

    /// Is trade application halted by an invariant breach?
    pub fn is_halted(&self) -> bool {
        self.halt_reason.is_some()
    }

    /// Manually clear the halt latch after investigating the breach
    pub fn clear_halt(&mut self) {
        if let Some(reason) = self.halt_reason.take() {
            info!("[PORTFOLIO] halt cleared (was: {reason})");
        }
    }

    /// Apply an accepted trade, returning the appended record.
    ///
    /// Validation precedes all mutation: on any error the state is exactly
    /// as it was before the call.
    pub fn apply(&mut self, trade: &AcceptedTrade) -> Result<TradeRecord> {
        if let Some(reason) = &self.halt_reason {
            return Err(PortfolioError::Halted {
                reason: reason.clone(),
            });
        }

        let record = match trade.action {
            TradeAction::Open => self.apply_open(trade)?,
            TradeAction::Close => self.apply_close(trade)?,
        };

        // Post-apply audit: a violation here is a logic defect, so latch
        // the halt and surface loudly
        if !self.state.invariants_hold() {
            let reason = format!(
                "invariant violated after trade {} (cash {}, value {}, realized {})",
                record.id,
                self.state.cash,
                self.state.total_value(),
                self.state.realized_pnl
            );
            error!("[PORTFOLIO] {reason}");
            self.halt_reason = Some(reason.clone());
            return Err(PortfolioError::StateInconsistency { reason });
        }

        self.metrics.record(&record, self.state.initial_capital);
        self.ledger.push(record.clone());
        Ok(record)
    }

    fn apply_open(&mut self, trade: &AcceptedTrade) -> Result<TradeRecord> {
        let slot = trade.instrument.slot();
        if self.state.has_position(&trade.symbol, slot) {
            return Err(PortfolioError::DuplicatePosition {
                symbol: trade.symbol.clone(),
                slot,
            });
        }

        let position = Position {
            symbol: trade.symbol.clone(),
            instrument: trade.instrument.clone(),
            direction: trade.direction,
            quantity: trade.quantity,
            entry_price: trade.price,
            entry_time: trade.timestamp,
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            capital_at_risk: trade.capital_at_risk,
        };

        let cost = position.cost_basis();
        if cost > self.state.cash {
            // The risk manager funds trades out of the same snapshot, so
            // reaching here means state drifted mid-cycle
            return Err(PortfolioError::StateInconsistency {
                reason: format!(
                    "open of {} needs {} but cash is {}",
                    trade.symbol, cost, self.state.cash
                ),
            });
        }

        self.state.cash -= cost;
        self.state.risk_consumed += trade.capital_at_risk;
        self.state
            .positions
            .insert((trade.symbol.clone(), slot), position);

        info!(
            "[PORTFOLIO] opened {} {:?} {} x{} at {} (cost {})",
            trade.symbol,
            trade.direction,
            trade.instrument.kind().as_str(),
            trade.quantity,
            trade.price,
            cost
        );
        Ok(self.make_record(trade, None))
    }

    fn apply_close(&mut self, trade: &AcceptedTrade) -> Result<TradeRecord> {
        let slot = trade.instrument.slot();
        let key = (trade.symbol.clone(), slot);
        let Some(position) = self.state.positions.get(&key) else {
            return Err(PortfolioError::UnknownPosition {
                symbol: trade.symbol.clone(),
                slot,
            });
        };

        // Partial closes realize proportionally; anything at or above the
        // held quantity closes the position in full
        let held_qty = position.quantity;
        let close_qty = trade.quantity.min(held_qty);
        if close_qty <= Decimal::ZERO {
            return Err(PortfolioError::StateInconsistency {
                reason: format!("close of {} with non-positive quantity", trade.symbol),
            });
        }

        let fraction = close_qty / held_qty;
        let pnl = position.direction.sign()
            * (trade.price - position.entry_price)
            * close_qty
            * position.instrument.unit_multiplier();
        let released_cost = position.cost_basis() * fraction;
        let released_risk = position.capital_at_risk * fraction;

        self.state.cash += released_cost + pnl;
        self.state.realized_pnl += pnl;
        self.state.risk_consumed = (self.state.risk_consumed - released_risk).max(Decimal::ZERO);

        if close_qty == held_qty {
            self.state.positions.remove(&key);
        } else if let Some(position) = self.state.positions.get_mut(&key) {
            position.quantity -= close_qty;
            position.capital_at_risk -= released_risk;
        }

        info!(
            "[PORTFOLIO] closed {} x{} at {} (pnl {})",
            trade.symbol, close_qty, trade.price, pnl
        );

        let mut record = self.make_record(trade, Some(pnl));
        record.quantity = close_qty;
        Ok(record)
    }

    /// Ratchet a trailing stop; the stop only ever moves toward profit.
    ///
    /// Capital at risk shrinks with the stop and the freed budget returns
    /// to the portfolio's risk headroom.
    pub fn apply_stop_adjustment(
        &mut self,
        symbol: &str,
        slot: StrategySlot,
        new_stop: Decimal,
    ) -> Result<()> {
        let key = (symbol.to_string(), slot);
        let Some(position) = self.state.positions.get_mut(&key) else {
            return Err(PortfolioError::UnknownPosition {
                symbol: symbol.to_string(),
                slot,
            });
        };

        if !position.stop_improves(new_stop) {
            return Ok(());
        }

        let old_risk = position.capital_at_risk;
        let distance = match position.direction {
            Direction::Long => position.entry_price - new_stop,
            Direction::Short => new_stop - position.entry_price,
        };
        let new_risk = (distance * position.quantity * position.instrument.unit_multiplier())
            .max(Decimal::ZERO);

        position.stop_loss = new_stop;
        position.capital_at_risk = new_risk;
        self.state.risk_consumed =
            (self.state.risk_consumed - old_risk + new_risk).max(Decimal::ZERO);

        info!("[PORTFOLIO] {symbol} {slot:?} stop raised to {new_stop}");
        Ok(())
    }

    fn make_record(&mut self, trade: &AcceptedTrade, pnl: Option<Decimal>) -> TradeRecord {
        let record = TradeRecord {
            id: self.next_record_id,
            timestamp: trade.timestamp,
            symbol: trade.symbol.clone(),
            kind: trade.instrument.kind(),
            direction: trade.direction,
            action: trade.action,
            quantity: trade.quantity,
            price: trade.price,
            pnl,
            rationale_score: trade.rationale.score,
            rationale_confidence: trade.rationale.confidence,
        };
        self.next_record_id += 1;
        record
    }
}
