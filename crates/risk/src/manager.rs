//! Position sizing, vetoes, and exit evaluation

use log::{info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sextant_core::{
    AcceptedTrade, CompositeSignal, Instrument, Portfolio, Position, StrategySlot, Timestamp,
    TradeAction, TradeProposal,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Risk budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of portfolio value put at risk per trade
    pub risk_per_trade: Decimal,
    /// Hard cap on summed capital-at-risk, as a fraction of portfolio value
    pub portfolio_risk_ceiling: Decimal,
    /// Max cost basis tied to one symbol, as a fraction of portfolio value
    pub max_symbol_exposure: Decimal,
    /// Max cost basis tied to one sector, as a fraction of portfolio value
    pub max_sector_exposure: Decimal,
    /// Symbol -> sector classification; unmapped symbols count as their own
    /// sector
    pub sector_map: HashMap<String, String>,
    /// Quantities round down to a multiple of this
    pub lot_size: Decimal,
    /// Close any position whose unrealized loss reaches this fraction of
    /// its cost basis
    pub max_loss_pct: Decimal,
    /// Unrealized gain (fraction of cost basis) that arms the trailing stop
    pub trail_trigger_pct: Decimal,
    /// Trailing stop distance below the mark once armed
    pub trail_distance_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: dec!(0.02),
            portfolio_risk_ceiling: dec!(0.10),
            max_symbol_exposure: dec!(0.40),
            max_sector_exposure: dec!(0.60),
            sector_map: HashMap::new(),
            lot_size: Decimal::ONE,
            max_loss_pct: dec!(0.20),
            trail_trigger_pct: dec!(0.10),
            trail_distance_pct: dec!(0.05),
        }
    }
}

/// Why a proposal was declined
///
/// Rejections are ordinary control flow: logged, recorded, never raised as
/// errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    InsufficientCash {
        required: Decimal,
        available: Decimal,
    },
    RiskCeilingExceeded {
        requested: Decimal,
        consumed: Decimal,
        ceiling: Decimal,
    },
    ConcentrationExceeded {
        scope: String,
        exposure: Decimal,
        cap: Decimal,
    },
    QuantityRoundsToZero,
    /// A position is already open in this (symbol, slot); reached only by
    /// manual proposals, since the selector refuses these upstream
    SlotOccupied {
        symbol: String,
        slot: StrategySlot,
    },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::InsufficientCash { .. } => "insufficient-cash",
            Rejection::RiskCeilingExceeded { .. } => "risk-ceiling-exceeded",
            Rejection::ConcentrationExceeded { .. } => "concentration-exceeded",
            Rejection::QuantityRoundsToZero => "quantity-rounds-to-zero",
            Rejection::SlotOccupied { .. } => "slot-occupied",
        }
    }
}

/// Outcome of evaluating one proposal
#[derive(Debug, Clone)]
pub enum RiskDecision {
    Accepted(AcceptedTrade),
    Rejected(Rejection),
}

impl RiskDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RiskDecision::Accepted(_))
    }
}

/// Action produced by exit evaluation
#[derive(Debug, Clone)]
pub enum ExitAction {
    /// Close the position at the mark; never risk-rejected
    Close(AcceptedTrade),
    /// Ratchet a trailing stop toward profit
    RaiseStop {
        symbol: String,
        slot: StrategySlot,
        new_stop: Decimal,
    },
}

/// Validates proposals and enforces exit rules against a portfolio snapshot
///
/// Stateless: every decision is a pure function of (config, snapshot,
/// inputs), so identical snapshots always replay to identical decisions.
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Validate a proposal against the portfolio, sizing it in the process.
    ///
    /// Close proposals pass unconditionally; exits are never vetoed.
    pub fn evaluate(&self, proposal: &TradeProposal, portfolio: &Portfolio) -> RiskDecision {
        if proposal.action == TradeAction::Close {
            return RiskDecision::Accepted(self.accept(proposal, proposal.quantity, Decimal::ZERO));
        }

        let slot = proposal.instrument.slot();
        if portfolio.has_position(&proposal.symbol, slot) {
            return self.reject(
                proposal,
                Rejection::SlotOccupied {
                    symbol: proposal.symbol.clone(),
                    slot,
                },
            );
        }

        let total_value = portfolio.total_value();
        let risk_capital = self.config.risk_per_trade * total_value;

        // Dollars lost per unit if the stop triggers
        let per_unit_risk = proposal.stop_distance() * proposal.instrument.unit_multiplier();
        if per_unit_risk <= Decimal::ZERO {
            return self.reject(proposal, Rejection::QuantityRoundsToZero);
        }

        let mut quantity = round_to_lot(risk_capital / per_unit_risk, self.config.lot_size);
        // Manual proposals may request a smaller size; never a larger one
        if proposal.quantity > Decimal::ZERO {
            quantity = quantity.min(proposal.quantity);
        }
        if quantity <= Decimal::ZERO {
            return self.reject(proposal, Rejection::QuantityRoundsToZero);
        }

        let cost_basis = match &proposal.instrument {
            Instrument::Equity => quantity * proposal.entry_price,
            Instrument::Options(s) => quantity * s.max_loss,
        };
        if cost_basis > portfolio.cash {
            return self.reject(
                proposal,
                Rejection::InsufficientCash {
                    required: cost_basis,
                    available: portfolio.cash,
                },
            );
        }

        let capital_at_risk = per_unit_risk * quantity;
        let ceiling = self.config.portfolio_risk_ceiling * total_value;
        if portfolio.risk_consumed + capital_at_risk > ceiling {
            return self.reject(
                proposal,
                Rejection::RiskCeilingExceeded {
                    requested: capital_at_risk,
                    consumed: portfolio.risk_consumed,
                    ceiling,
                },
            );
        }

        if let Some(rejection) = self.concentration_veto(proposal, portfolio, cost_basis, total_value)
        {
            return self.reject(proposal, rejection);
        }

        info!(
            "[RISK] accepted {} {:?} {} x{} at {} (at-risk {})",
            proposal.symbol,
            proposal.direction,
            proposal.instrument.kind().as_str(),
            quantity,
            proposal.entry_price,
            capital_at_risk
        );
        RiskDecision::Accepted(self.accept(proposal, quantity, capital_at_risk))
    }

    /// Evaluate every open position against its exit rules.
    ///
    /// `marks` carries per-unit mark prices keyed by (symbol, slot);
    /// positions without a mark this cycle are skipped. Output order is
    /// deterministic (sorted by symbol then slot).
    pub fn evaluate_exits(
        &self,
        portfolio: &Portfolio,
        marks: &HashMap<(String, StrategySlot), Decimal>,
        now: Timestamp,
    ) -> Vec<ExitAction> {
        let mut keys: Vec<&(String, StrategySlot)> = portfolio.positions.keys().collect();
        keys.sort_by(|a, b| (&a.0, slot_order(a.1)).cmp(&(&b.0, slot_order(b.1))));

        let mut actions = Vec::new();
        for key in keys {
            let position = &portfolio.positions[key];
            let Some(&mark) = marks.get(key) else {
                continue;
            };

            if let Some(action) = self.exit_for(position, mark, now) {
                actions.push(action);
            }
        }
        actions
    }

    fn exit_for(&self, position: &Position, mark: Decimal, now: Timestamp) -> Option<ExitAction> {
        let cost_basis = position.cost_basis();
        let unrealized = position.unrealized_pnl(mark);

        let backstop_hit = !cost_basis.is_zero()
            && unrealized <= -self.config.max_loss_pct * cost_basis;

        if position.stop_breached(mark) || position.target_reached(mark) || backstop_hit {
            let trigger = if position.stop_breached(mark) {
                "stop-loss"
            } else if position.target_reached(mark) {
                "take-profit"
            } else {
                "max-loss backstop"
            };
            warn!(
                "[RISK] {} {:?} exit: {} at mark {} (entry {})",
                position.symbol, position.slot(), trigger, mark, position.entry_price
            );
            return Some(ExitAction::Close(self.close_trade(position, mark, now)));
        }

        // Trailing stop on profitable equity positions
        if matches!(position.instrument, Instrument::Equity)
            && !cost_basis.is_zero()
            && unrealized / cost_basis > self.config.trail_trigger_pct
        {
            let new_stop = match position.direction {
                sextant_core::Direction::Long => {
                    mark * (Decimal::ONE - self.config.trail_distance_pct)
                }
                sextant_core::Direction::Short => {
                    mark * (Decimal::ONE + self.config.trail_distance_pct)
                }
            };
            if position.stop_improves(new_stop) {
                return Some(ExitAction::RaiseStop {
                    symbol: position.symbol.clone(),
                    slot: position.slot(),
                    new_stop,
                });
            }
        }

        None
    }

    fn close_trade(&self, position: &Position, mark: Decimal, now: Timestamp) -> AcceptedTrade {
        AcceptedTrade {
            proposal_id: uuid::Uuid::new_v4(),
            symbol: position.symbol.clone(),
            instrument: position.instrument.clone(),
            direction: position.direction,
            action: TradeAction::Close,
            quantity: position.quantity,
            price: mark,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            capital_at_risk: Decimal::ZERO,
            rationale: CompositeSignal::neutral(&position.symbol, now),
            timestamp: now,
        }
    }

    fn concentration_veto(
        &self,
        proposal: &TradeProposal,
        portfolio: &Portfolio,
        cost_basis: Decimal,
        total_value: Decimal,
    ) -> Option<Rejection> {
        let symbol_cap = self.config.max_symbol_exposure * total_value;
        let symbol_exposure = portfolio.symbol_exposure(&proposal.symbol) + cost_basis;
        if symbol_exposure > symbol_cap {
            return Some(Rejection::ConcentrationExceeded {
                scope: format!("symbol {}", proposal.symbol),
                exposure: symbol_exposure,
                cap: symbol_cap,
            });
        }

        let sector = self.sector_of(&proposal.symbol);
        let sector_cap = self.config.max_sector_exposure * total_value;
        let sector_exposure: Decimal = portfolio
            .positions
            .iter()
            .filter(|((symbol, _), _)| self.sector_of(symbol) == sector)
            .map(|(_, p)| p.cost_basis())
            .sum::<Decimal>()
            + cost_basis;
        if sector_exposure > sector_cap {
            return Some(Rejection::ConcentrationExceeded {
                scope: format!("sector {sector}"),
                exposure: sector_exposure,
                cap: sector_cap,
            });
        }

        None
    }

    fn sector_of<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.config
            .sector_map
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }

    fn accept(
        &self,
        proposal: &TradeProposal,
        quantity: Decimal,
        capital_at_risk: Decimal,
    ) -> AcceptedTrade {
        AcceptedTrade {
            proposal_id: proposal.id,
            symbol: proposal.symbol.clone(),
            instrument: proposal.instrument.clone(),
            direction: proposal.direction,
            action: proposal.action,
            quantity,
            price: proposal.entry_price,
            stop_loss: proposal.stop_loss,
            take_profit: proposal.take_profit,
            capital_at_risk,
            rationale: proposal.rationale.clone(),
            timestamp: proposal.timestamp,
        }
    }

    fn reject(&self, proposal: &TradeProposal, rejection: Rejection) -> RiskDecision {
        info!(
            "[RISK] rejected {} {:?}: {}",
            proposal.symbol,
            proposal.instrument.kind(),
            rejection.reason()
        );
        RiskDecision::Rejected(rejection)
    }
}

fn round_to_lot(quantity: Decimal, lot: Decimal) -> Decimal {
    if lot <= Decimal::ZERO {
        return quantity.floor();
    }
    (quantity / lot).floor() * lot
}

fn slot_order(slot: StrategySlot) -> u8 {
    match slot {
        StrategySlot::Equity => 0,
        StrategySlot::Options => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sextant_core::{Direction, Instrument, TradeProposal};
    use uuid::Uuid;

    fn equity_proposal(entry: Decimal, stop: Decimal, target: Decimal) -> TradeProposal {
        TradeProposal {
            id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            instrument: Instrument::Equity,
            direction: Direction::Long,
            action: TradeAction::Open,
            quantity: Decimal::ZERO,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            rationale: CompositeSignal::neutral("AAPL", Utc::now()),
            timestamp: Utc::now(),
        }
    }

    fn position(symbol: &str, entry: Decimal, stop: Decimal, target: Decimal) -> Position {
        let quantity = dec!(100);
        Position {
            symbol: symbol.to_string(),
            instrument: Instrument::Equity,
            direction: Direction::Long,
            quantity,
            entry_price: entry,
            entry_time: Utc::now(),
            stop_loss: stop,
            take_profit: target,
            capital_at_risk: (entry - stop) * quantity,
        }
    }

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default())
    }

    #[test]
    fn test_sizing_scenario() {
        // $100k capital, 2% risk, entry 50, stop 47.50:
        // quantity = floor(2000 / 2.50) = 800
        let portfolio = Portfolio::new(dec!(100000));
        let proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));

        match manager().evaluate(&proposal, &portfolio) {
            RiskDecision::Accepted(trade) => {
                assert_eq!(trade.quantity, dec!(800));
                assert_eq!(trade.capital_at_risk, dec!(2000));
            }
            RiskDecision::Rejected(r) => panic!("expected accept, got {r:?}"),
        }
    }

    #[test]
    fn test_insufficient_cash_rejection() {
        // Total value held at 100k via other-position cost bases, but only
        // 30k cash: the 800 x 50 = 40k entry cannot be funded
        let mut portfolio = Portfolio::new(dec!(100000));
        let other = position("MSFT", dec!(700), dec!(699), dec!(710));
        portfolio.cash -= other.cost_basis();
        portfolio.risk_consumed += other.capital_at_risk;
        portfolio
            .positions
            .insert(("MSFT".to_string(), StrategySlot::Equity), other);
        assert_eq!(portfolio.cash, dec!(30000));

        let proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        match manager().evaluate(&proposal, &portfolio) {
            RiskDecision::Rejected(Rejection::InsufficientCash { required, available }) => {
                assert_eq!(required, dec!(40000));
                assert_eq!(available, dec!(30000));
            }
            other => panic!("expected InsufficientCash, got {other:?}"),
        }
    }

    #[test]
    fn test_risk_ceiling_is_hard_cap() {
        let mut portfolio = Portfolio::new(dec!(100000));
        // Existing positions already consume 9k of the 10k ceiling
        portfolio.risk_consumed = dec!(9000);

        let proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        match manager().evaluate(&proposal, &portfolio) {
            RiskDecision::Rejected(Rejection::RiskCeilingExceeded {
                requested,
                consumed,
                ceiling,
            }) => {
                assert_eq!(requested, dec!(2000));
                assert_eq!(consumed, dec!(9000));
                assert_eq!(ceiling, dec!(10000));
            }
            other => panic!("expected RiskCeilingExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_quantity_rounds_to_zero_rejection() {
        // Tiny portfolio, wide stop: floor(2 / 50) = 0
        let portfolio = Portfolio::new(dec!(100));
        let proposal = equity_proposal(dec!(500), dec!(450), dec!(600));
        match manager().evaluate(&proposal, &portfolio) {
            RiskDecision::Rejected(Rejection::QuantityRoundsToZero) => {}
            other => panic!("expected QuantityRoundsToZero, got {other:?}"),
        }
    }

    #[test]
    fn test_sector_concentration_rejection() {
        let mut config = RiskConfig::default();
        config.sector_map.insert("AAPL".to_string(), "tech".to_string());
        config.sector_map.insert("MSFT".to_string(), "tech".to_string());
        config.max_sector_exposure = dec!(0.45);
        let manager = RiskManager::new(config);

        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("MSFT", dec!(100), dec!(99.90), dec!(110));
        portfolio.cash -= held.cost_basis(); // 10k held in tech
        portfolio.risk_consumed += held.capital_at_risk;
        portfolio
            .positions
            .insert(("MSFT".to_string(), StrategySlot::Equity), held);

        // New 40k AAPL entry pushes tech to 50k > 45% cap
        let proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        match manager.evaluate(&proposal, &portfolio) {
            RiskDecision::Rejected(Rejection::ConcentrationExceeded { scope, .. }) => {
                assert!(scope.contains("sector"));
            }
            other => panic!("expected ConcentrationExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_quantity_shrinks_but_never_grows() {
        let portfolio = Portfolio::new(dec!(100000));

        let mut small = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        small.quantity = dec!(100);
        match manager().evaluate(&small, &portfolio) {
            RiskDecision::Accepted(trade) => assert_eq!(trade.quantity, dec!(100)),
            other => panic!("expected accept, got {other:?}"),
        }

        let mut oversized = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        oversized.quantity = dec!(5000);
        match manager().evaluate(&oversized, &portfolio) {
            RiskDecision::Accepted(trade) => assert_eq!(trade.quantity, dec!(800)),
            other => panic!("expected accept, got {other:?}"),
        }
    }

    #[test]
    fn test_occupied_slot_rejected_for_manual_entries() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("AAPL", dec!(100), dec!(95), dec!(115));
        portfolio.cash -= held.cost_basis();
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        let proposal = equity_proposal(dec!(100), dec!(95), dec!(115));
        match manager().evaluate(&proposal, &portfolio) {
            RiskDecision::Rejected(Rejection::SlotOccupied { slot, .. }) => {
                assert_eq!(slot, StrategySlot::Equity);
            }
            other => panic!("expected SlotOccupied, got {other:?}"),
        }
    }

    #[test]
    fn test_close_proposals_bypass_all_vetoes() {
        // Zero cash, zero headroom: a close must still pass
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.cash = Decimal::ZERO;
        portfolio.risk_consumed = dec!(100000);

        let mut proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        proposal.action = TradeAction::Close;
        proposal.quantity = dec!(800);

        assert!(manager().evaluate(&proposal, &portfolio).is_accepted());
    }

    #[test]
    fn test_stop_breach_closes_full_position() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("AAPL", dec!(100), dec!(95), dec!(115));
        portfolio.cash -= held.cost_basis();
        portfolio.risk_consumed += held.capital_at_risk;
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        let mut marks = HashMap::new();
        marks.insert(("AAPL".to_string(), StrategySlot::Equity), dec!(94));

        let actions = manager().evaluate_exits(&portfolio, &marks, Utc::now());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ExitAction::Close(trade) => {
                assert_eq!(trade.quantity, dec!(100));
                assert_eq!(trade.price, dec!(94));
                assert_eq!(trade.action, TradeAction::Close);
            }
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn test_take_profit_closes_position() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("AAPL", dec!(100), dec!(95), dec!(115));
        portfolio.cash -= held.cost_basis();
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        let mut marks = HashMap::new();
        marks.insert(("AAPL".to_string(), StrategySlot::Equity), dec!(115));

        let actions = manager().evaluate_exits(&portfolio, &marks, Utc::now());
        assert!(matches!(actions[0], ExitAction::Close(_)));
    }

    #[test]
    fn test_max_loss_backstop_closes_before_distant_stop() {
        let mut portfolio = Portfolio::new(dec!(100000));
        // Stop parked far below; the 20% backstop is the binding exit
        let held = position("AAPL", dec!(100), dec!(10), dec!(200));
        portfolio.cash -= held.cost_basis();
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        // -25% unrealized, stop at 10 untouched
        let mut marks = HashMap::new();
        marks.insert(("AAPL".to_string(), StrategySlot::Equity), dec!(75));

        let actions = manager().evaluate_exits(&portfolio, &marks, Utc::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ExitAction::Close(_)));
    }

    #[test]
    fn test_trailing_stop_ratchets_up_only() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("AAPL", dec!(100), dec!(95), dec!(140));
        portfolio.cash -= held.cost_basis();
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        // +12% gain arms the trail: stop moves to 112 * 0.95 = 106.40
        let mut marks = HashMap::new();
        marks.insert(("AAPL".to_string(), StrategySlot::Equity), dec!(112));

        let actions = manager().evaluate_exits(&portfolio, &marks, Utc::now());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ExitAction::RaiseStop { new_stop, .. } => assert_eq!(*new_stop, dec!(106.40)),
            other => panic!("expected RaiseStop, got {other:?}"),
        }

        // Below the trigger: no adjustment
        marks.insert(("AAPL".to_string(), StrategySlot::Equity), dec!(105));
        assert!(manager().evaluate_exits(&portfolio, &marks, Utc::now()).is_empty());
    }

    #[test]
    fn test_positions_without_marks_are_skipped() {
        let mut portfolio = Portfolio::new(dec!(100000));
        let held = position("AAPL", dec!(100), dec!(95), dec!(115));
        portfolio.cash -= held.cost_basis();
        portfolio
            .positions
            .insert(("AAPL".to_string(), StrategySlot::Equity), held);

        let actions = manager().evaluate_exits(&portfolio, &HashMap::new(), Utc::now());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_determinism_same_inputs_same_decision() {
        let portfolio = Portfolio::new(dec!(100000));
        let proposal = equity_proposal(dec!(50), dec!(47.50), dec!(57.50));
        let manager = manager();

        let first = manager.evaluate(&proposal, &portfolio);
        let second = manager.evaluate(&proposal, &portfolio);
        match (first, second) {
            (RiskDecision::Accepted(a), RiskDecision::Accepted(b)) => {
                assert_eq!(a.quantity, b.quantity);
                assert_eq!(a.capital_at_risk, b.capital_at_risk);
            }
            _ => panic!("expected deterministic accepts"),
        }
    }
}
