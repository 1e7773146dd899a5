//! The trading engine state machine and cycle runner

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use sextant_core::{
    AcceptedTrade, Instrument, Portfolio, StrategySlot, Timestamp, TradeProposal, TradeRecord,
};
use sextant_ports::{Clock, MarketCalendar, MarketDataProvider, SignalProvider, TradeStore};
use sextant_portfolio::{PerformanceMetrics, PortfolioError, PortfolioManager};
use sextant_risk::{ExitAction, RiskDecision, RiskManager};
use sextant_signal::SignalAggregator;
use sextant_strategy::StrategySelector;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::MissedTickBehavior;

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    MarketOpenCheck,
    RunCycle,
    Stopped,
}

/// What one scheduler tick produced
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A full cycle ran
    Completed(CycleReport),
    /// Outside trading hours; nothing was proposed or evaluated
    MarketClosed,
    /// Another cycle was still in progress; refused as a no-op
    Skipped,
    /// Clock skew or similar scheduling fault; tick skipped
    Fault(String),
    /// Shutdown was requested
    Stopped,
}

/// Per-cycle accounting, logged and returned to callers
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub timestamp: Timestamp,
    pub symbols_processed: usize,
    pub proposals: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub exits: usize,
    pub stop_adjustments: usize,
    pub errors: usize,
}

impl CycleReport {
    fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            symbols_processed: 0,
            proposals: 0,
            accepted: 0,
            rejected: 0,
            exits: 0,
            stop_adjustments: 0,
            errors: 0,
        }
    }
}

/// Drives the decision pipeline on a recurring schedule gated to market
/// hours
///
/// Single writer: the engine owns the portfolio manager and is the only
/// component that applies trades. Observers read the published snapshot,
/// which reflects the last committed state and never blocks on a cycle.
pub struct TradingEngine {
    config: EngineConfig,
    aggregator: SignalAggregator,
    selector: StrategySelector,
    risk: RiskManager,

    signals: Arc<dyn SignalProvider>,
    market: Arc<dyn MarketDataProvider>,
    calendar: Arc<dyn MarketCalendar>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn TradeStore>,

    portfolio: Mutex<PortfolioManager>,
    /// Last committed state, readable without touching the manager
    published: Arc<RwLock<Portfolio>>,
    /// Mirror of the append-only ledger for non-blocking history queries
    published_ledger: Arc<RwLock<Vec<TradeRecord>>>,

    state: std::sync::Mutex<EngineState>,
    last_tick: std::sync::Mutex<Option<Timestamp>>,
    /// Run-in-progress guard; one cycle at a time
    cycle_running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    /// Held so the watch channel stays open even when no `run()` loop is
    /// subscribed; without a live receiver `send` is a no-op.
    _shutdown_rx: watch::Receiver<bool>,
}

impl TradingEngine {
    pub fn new(
        config: EngineConfig,
        signals: Arc<dyn SignalProvider>,
        market: Arc<dyn MarketDataProvider>,
        calendar: Arc<dyn MarketCalendar>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn TradeStore>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let manager = PortfolioManager::new(config.initial_capital);
        let published = Arc::new(RwLock::new(manager.snapshot()));

        Self {
            aggregator: SignalAggregator::new(config.aggregator.clone()),
            selector: StrategySelector::new(config.selector.clone()),
            risk: RiskManager::new(config.risk.clone()),
            config,
            signals,
            market,
            calendar,
            clock,
            store,
            portfolio: Mutex::new(manager),
            published,
            published_ledger: Arc::new(RwLock::new(Vec::new())),
            state: std::sync::Mutex::new(EngineState::Idle),
            last_tick: std::sync::Mutex::new(None),
            cycle_running: AtomicBool::new(false),
            shutdown_tx,
            _shutdown_rx,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// Last committed portfolio state; never blocks on an in-progress cycle
    pub async fn snapshot(&self) -> Portfolio {
        self.published.read().await.clone()
    }

    /// Trade records with timestamps in [from, to], from the published
    /// ledger mirror
    pub async fn trade_history(&self, from: Timestamp, to: Timestamp) -> Vec<TradeRecord> {
        self.published_ledger
            .read()
            .await
            .iter()
            .filter(|r| r.timestamp >= from && r.timestamp <= to)
            .cloned()
            .collect()
    }

    /// Current performance statistics
    pub async fn metrics(&self) -> PerformanceMetrics {
        self.portfolio.lock().await.metrics()
    }

    /// Request shutdown; honored between symbols, never mid-application
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Run the recurring schedule until shutdown
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.cycle_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "[ENGINE] starting: {} symbols, {}s interval",
            self.config.universe.len(),
            self.config.cycle_interval_secs
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        CycleOutcome::Completed(report) => info!(
                            "[ENGINE] cycle done: {} symbols, {} proposals, {} accepted, \
                             {} rejected, {} exits, {} errors",
                            report.symbols_processed,
                            report.proposals,
                            report.accepted,
                            report.rejected,
                            report.exits,
                            report.errors
                        ),
                        CycleOutcome::MarketClosed => {
                            debug!("[ENGINE] market closed, waiting");
                        }
                        CycleOutcome::Skipped => {
                            warn!("[ENGINE] previous cycle still running, tick skipped");
                        }
                        CycleOutcome::Fault(reason) => {
                            warn!("[ENGINE] scheduling fault: {reason}");
                        }
                        CycleOutcome::Stopped => break,
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.set_state(EngineState::Stopped);
        info!("[ENGINE] stopped");
    }

    /// One scheduler tick: market-hours gate, then at most one cycle
    pub async fn tick(&self) -> CycleOutcome {
        if self.is_shutdown() {
            self.set_state(EngineState::Stopped);
            return CycleOutcome::Stopped;
        }

        self.set_state(EngineState::MarketOpenCheck);
        let now = self.clock.now();

        // Clock running backwards means the schedule can't be trusted this
        // tick
        {
            let mut last = self.last_tick.lock().expect("tick lock poisoned");
            if let Some(previous) = *last {
                if now < previous {
                    self.set_state(EngineState::Idle);
                    return CycleOutcome::Fault(format!(
                        "clock skew: now {now} before previous tick {previous}"
                    ));
                }
            }
            *last = Some(now);
        }

        if !self.calendar.is_open(now) {
            self.set_state(EngineState::Idle);
            return CycleOutcome::MarketClosed;
        }

        self.run_cycle(now).await
    }

    /// Run one full cycle over the universe, then the exit pass.
    ///
    /// Refused as a no-op when a cycle is already in progress.
    pub async fn run_cycle(&self, now: Timestamp) -> CycleOutcome {
        if self
            .cycle_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CycleOutcome::Skipped;
        }

        self.set_state(EngineState::RunCycle);
        let mut report = CycleReport::new(now);
        let mut halted = false;

        for symbol in &self.config.universe {
            if self.is_shutdown() {
                break;
            }

            match self.process_symbol(symbol, now, &mut report).await {
                Ok(()) => report.symbols_processed += 1,
                Err(EngineError::Portfolio(
                    e @ (PortfolioError::StateInconsistency { .. } | PortfolioError::Halted { .. }),
                )) => {
                    error!("[ENGINE] {symbol}: {e}; aborting cycle");
                    report.errors += 1;
                    halted = true;
                    break;
                }
                Err(e) => {
                    // Failure isolation: this symbol is skipped, the cycle
                    // continues
                    warn!("[ENGINE] {symbol}: {e}; skipping for this cycle");
                    report.errors += 1;
                }
            }
        }

        if !halted && !self.is_shutdown() {
            if let Err(e) = self.exit_pass(now, &mut report).await {
                error!("[ENGINE] exit pass failed: {e}");
                report.errors += 1;
            }
        }

        let snapshot = self.snapshot().await;
        if let Err(e) = self.store.persist_snapshot(&snapshot).await {
            warn!("[ENGINE] snapshot persist failed: {e}");
        }

        self.set_state(EngineState::Idle);
        self.cycle_running.store(false, Ordering::SeqCst);
        CycleOutcome::Completed(report)
    }

    /// Aggregate, select, risk-check, and apply for one symbol.
    ///
    /// Reads the portfolio as of this symbol's evaluation, so trades
    /// applied earlier in the cycle are visible to the risk checks.
    async fn process_symbol(
        &self,
        symbol: &str,
        now: Timestamp,
        report: &mut CycleReport,
    ) -> Result<()> {
        let signals = match self.signals.signals(symbol, now).await {
            Ok(signals) => signals,
            Err(e) => {
                // Missing data degrades to the no-signal composite
                debug!("[ENGINE] {symbol}: signals unavailable ({e}), treating as none");
                Vec::new()
            }
        };

        let composite = self.aggregator.aggregate(symbol, &signals, now);
        let chain = self.market.options_context(symbol).await?;

        let snapshot = self.portfolio.lock().await.snapshot();
        let Some(proposal) = self.selector.select(&composite, &chain, &snapshot) else {
            return Ok(());
        };
        report.proposals += 1;

        match self.risk.evaluate(&proposal, &snapshot) {
            RiskDecision::Accepted(trade) => {
                self.commit(&trade).await?;
                report.accepted += 1;
            }
            RiskDecision::Rejected(rejection) => {
                info!(
                    "[ENGINE] {symbol}: proposal rejected ({})",
                    rejection.reason()
                );
                report.rejected += 1;
            }
        }
        Ok(())
    }

    /// Mark every open position and enforce exit rules
    async fn exit_pass(&self, now: Timestamp, report: &mut CycleReport) -> Result<()> {
        let snapshot = self.portfolio.lock().await.snapshot();
        if snapshot.positions.is_empty() {
            return Ok(());
        }

        let mut marks: HashMap<(String, StrategySlot), Decimal> = HashMap::new();
        for ((symbol, slot), position) in &snapshot.positions {
            if self.is_shutdown() {
                return Ok(());
            }
            match self.mark_position(symbol, position).await {
                Some(mark) => {
                    marks.insert((symbol.clone(), *slot), mark);
                }
                None => {
                    debug!("[ENGINE] {symbol} {slot:?}: no mark this cycle, exit check skipped");
                }
            }
        }

        for action in self.risk.evaluate_exits(&snapshot, &marks, now) {
            if self.is_shutdown() {
                return Ok(());
            }
            match action {
                ExitAction::Close(trade) => {
                    self.commit(&trade).await?;
                    report.exits += 1;
                }
                ExitAction::RaiseStop {
                    symbol,
                    slot,
                    new_stop,
                } => {
                    let mut manager = self.portfolio.lock().await;
                    manager.apply_stop_adjustment(&symbol, slot, new_stop)?;
                    let snapshot = manager.snapshot();
                    drop(manager);
                    *self.published.write().await = snapshot;
                    report.stop_adjustments += 1;
                }
            }
        }
        Ok(())
    }

    async fn mark_position(
        &self,
        symbol: &str,
        position: &sextant_core::Position,
    ) -> Option<Decimal> {
        match &position.instrument {
            Instrument::Equity => self.market.quote(symbol).await.ok(),
            Instrument::Options(structure) => {
                let chain = self.market.options_context(symbol).await.ok()?;
                structure.mark_value(&chain)
            }
        }
    }

    /// Apply an accepted trade, publish the new state, and persist the
    /// record. Application is atomic; persistence is at-least-once (a
    /// failed persist is logged and replayable from the ledger).
    async fn commit(&self, trade: &AcceptedTrade) -> Result<TradeRecord> {
        let mut manager = self.portfolio.lock().await;
        let record = manager.apply(trade)?;
        let snapshot = manager.snapshot();
        drop(manager);

        *self.published.write().await = snapshot;
        self.published_ledger.write().await.push(record.clone());

        if let Err(e) = self.store.persist_trade(&record).await {
            warn!(
                "[ENGINE] persist of trade record {} failed ({e}); recoverable by replay",
                record.id
            );
        }
        Ok(record)
    }

    /// Manual-override entry point: inject a proposal straight into the
    /// risk path, bypassing the selector.
    ///
    /// Still gated to market hours; the no-trades-outside-hours invariant
    /// has no manual exception.
    pub async fn submit_manual(&self, proposal: TradeProposal) -> Result<RiskDecision> {
        let now = self.clock.now();
        if !self.calendar.is_open(now) {
            return Err(EngineError::SchedulingFault(
                "manual trade outside market hours".to_string(),
            ));
        }

        let snapshot = self.portfolio.lock().await.snapshot();
        let decision = self.risk.evaluate(&proposal, &snapshot);
        if let RiskDecision::Accepted(trade) = &decision {
            self.commit(trade).await?;
            info!(
                "[ENGINE] manual trade applied: {} {:?} x{}",
                trade.symbol, trade.direction, trade.quantity
            );
        }
        Ok(decision)
    }
}
