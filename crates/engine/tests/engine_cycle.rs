//! Trading engine integration tests
//!
//! Exercises the full pipeline against scripted providers:
//! 1. Signals flow through aggregation, selection, and risk into the
//!    portfolio
//! 2. The market-hours gate produces zero pipeline activity when closed
//! 3. Exit rules close breached positions deterministically
//! 4. The run-in-progress guard refuses overlapping cycles
//! 5. Manual proposals enter through the risk path only

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sextant_clock::FixedClock;
use sextant_core::{
    ChainSnapshot, CompositeSignal, Direction, Instrument, OptionQuote, OptionType, Portfolio,
    Signal, SignalSource, StrategySlot, Timestamp, TradeAction, TradeProposal, TradeRecord,
};
use sextant_engine::{CycleOutcome, EngineConfig, EngineState, TradingEngine};
use sextant_ports::{
    Clock, MarketDataProvider, ProviderError, ProviderResult, SignalProvider, StoreResult,
    TradeStore, WeekdayCalendar,
};
use sextant_risk::{Rejection, RiskDecision};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Wednesday mid-session
fn market_open_time() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 12, 14, 0, 0).unwrap()
}

/// Saturday
fn market_closed_time() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 15, 14, 0, 0).unwrap()
}

/// Scripted signal provider with call counting
struct ScriptedSignals {
    /// (value, confidence) per source, same for every symbol
    script: Vec<(SignalSource, Decimal, Decimal)>,
    calls: AtomicUsize,
    /// Artificial latency, for overlap tests
    delay_ms: u64,
}

impl ScriptedSignals {
    fn strong_long() -> Self {
        Self {
            script: vec![
                (SignalSource::Technical, dec!(0.8), dec!(0.9)),
                (SignalSource::OptionsFlow, dec!(0.7), dec!(0.85)),
                (SignalSource::AnalystRating, dec!(0.6), dec!(0.8)),
            ],
            calls: AtomicUsize::new(0),
            delay_ms: 0,
        }
    }

    fn silent() -> Self {
        Self {
            script: Vec::new(),
            calls: AtomicUsize::new(0),
            delay_ms: 0,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalProvider for ScriptedSignals {
    async fn signals(&self, symbol: &str, timestamp: Timestamp) -> ProviderResult<Vec<Signal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        Ok(self
            .script
            .iter()
            .map(|&(source, value, confidence)| {
                Signal::new(source, symbol, value, confidence, timestamp)
            })
            .collect())
    }
}

/// Scripted market data with adjustable quotes
struct ScriptedMarket {
    quotes: Mutex<HashMap<String, Decimal>>,
    chain_calls: AtomicUsize,
}

impl ScriptedMarket {
    fn new(quotes: &[(&str, Decimal)]) -> Self {
        Self {
            quotes: Mutex::new(
                quotes
                    .iter()
                    .map(|(s, p)| (s.to_string(), *p))
                    .collect(),
            ),
            chain_calls: AtomicUsize::new(0),
        }
    }

    fn set_quote(&self, symbol: &str, price: Decimal) {
        self.quotes
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    fn chain_call_count(&self) -> usize {
        self.chain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarket {
    async fn quote(&self, symbol: &str) -> ProviderResult<Decimal> {
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| ProviderError::unavailable(symbol, "no quote"))
    }

    async fn options_context(&self, symbol: &str) -> ProviderResult<ChainSnapshot> {
        self.chain_calls.fetch_add(1, Ordering::SeqCst);
        let spot = self.quote(symbol).await?;
        let expiry = (market_open_time() + Duration::days(45)).date_naive();

        // Sparse chain: enough for equity proposals, not for multi-leg
        // structures
        let quotes = vec![OptionQuote {
            option_type: OptionType::Call,
            strike: spot,
            expiry,
            last_price: dec!(2.00),
        }];
        Ok(ChainSnapshot {
            symbol: symbol.to_string(),
            spot,
            implied_vol: dec!(0.30),
            atr: None,
            expiries: vec![expiry],
            quotes,
        })
    }
}

/// Store that records what was persisted
#[derive(Default)]
struct RecordingStore {
    trades: Mutex<Vec<TradeRecord>>,
    snapshots: AtomicUsize,
}

#[async_trait]
impl TradeStore for RecordingStore {
    async fn persist_trade(&self, record: &TradeRecord) -> StoreResult<()> {
        self.trades.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn persist_snapshot(&self, _portfolio: &Portfolio) -> StoreResult<()> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    engine: Arc<TradingEngine>,
    signals: Arc<ScriptedSignals>,
    market: Arc<ScriptedMarket>,
    store: Arc<RecordingStore>,
    clock: Arc<FixedClock>,
}

fn harness(signals: ScriptedSignals, market: ScriptedMarket, now: Timestamp) -> Harness {
    let config = EngineConfig {
        universe: vec!["AAPL".to_string()],
        ..Default::default()
    };
    let signals = Arc::new(signals);
    let market = Arc::new(market);
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(FixedClock::new(now));

    let engine = Arc::new(TradingEngine::new(
        config,
        signals.clone(),
        market.clone(),
        Arc::new(WeekdayCalendar::default()),
        clock.clone(),
        store.clone(),
    ));

    Harness {
        engine,
        signals,
        market,
        store,
        clock,
    }
}

fn manual_equity_proposal(now: Timestamp) -> TradeProposal {
    TradeProposal {
        id: Uuid::new_v4(),
        symbol: "AAPL".to_string(),
        instrument: Instrument::Equity,
        direction: Direction::Long,
        action: TradeAction::Open,
        quantity: dec!(100),
        entry_price: dec!(100),
        stop_loss: dec!(95),
        take_profit: dec!(115),
        rationale: CompositeSignal::neutral("AAPL", now),
        timestamp: now,
    }
}

#[tokio::test]
async fn test_full_cycle_opens_position_from_signals() {
    let h = harness(
        ScriptedSignals::strong_long(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    let outcome = h.engine.tick().await;
    let report = match outcome {
        CycleOutcome::Completed(report) => report,
        other => panic!("expected completed cycle, got {other:?}"),
    };

    assert_eq!(report.proposals, 1);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 0);

    let snapshot = h.engine.snapshot().await;
    assert!(snapshot.has_position("AAPL", StrategySlot::Equity));
    assert!(snapshot.cash < snapshot.initial_capital);

    // One opening record persisted, one end-of-cycle snapshot
    let persisted = h.store.trades.lock().unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].action, TradeAction::Open);
    assert_eq!(h.store.snapshots.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_market_closed_means_zero_pipeline_activity() {
    let h = harness(
        ScriptedSignals::strong_long(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_closed_time(),
    );

    let outcome = h.engine.tick().await;
    assert!(matches!(outcome, CycleOutcome::MarketClosed));

    // The gate is hard: no provider was consulted, nothing was proposed,
    // nothing persisted
    assert_eq!(h.signals.call_count(), 0);
    assert_eq!(h.market.chain_call_count(), 0);
    assert!(h.store.trades.lock().unwrap().is_empty());
    assert_eq!(h.engine.state(), EngineState::Idle);

    let snapshot = h.engine.snapshot().await;
    assert_eq!(snapshot.cash, snapshot.initial_capital);
}

#[tokio::test]
async fn test_stop_breach_closes_exactly_once_with_no_reopen() {
    // Quiet signals so nothing opens from the pipeline
    let h = harness(
        ScriptedSignals::silent(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    // Seed a long position: entry 100, stop 95, take-profit 115
    let decision = h
        .engine
        .submit_manual(manual_equity_proposal(market_open_time()))
        .await
        .unwrap();
    assert!(decision.is_accepted());

    // Price gaps through the stop
    h.market.set_quote("AAPL", dec!(94));
    h.clock.advance(Duration::minutes(5));

    let outcome = h.engine.tick().await;
    let report = match outcome {
        CycleOutcome::Completed(report) => report,
        other => panic!("expected completed cycle, got {other:?}"),
    };

    // Exactly one close, full quantity, and no new proposal for the symbol
    assert_eq!(report.exits, 1);
    assert_eq!(report.proposals, 0);

    let history = h
        .engine
        .trade_history(market_open_time() - Duration::hours(1), h.clock.now())
        .await;
    let closes: Vec<&TradeRecord> = history
        .iter()
        .filter(|r| r.action == TradeAction::Close)
        .collect();
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].quantity, dec!(100));
    assert_eq!(closes[0].price, dec!(94));
    assert_eq!(closes[0].pnl, Some(dec!(-600)));

    let snapshot = h.engine.snapshot().await;
    assert!(!snapshot.has_position("AAPL", StrategySlot::Equity));

    // A second cycle at the same price finds nothing left to close
    h.clock.advance(Duration::minutes(5));
    match h.engine.tick().await {
        CycleOutcome::Completed(report) => assert_eq!(report.exits, 0),
        other => panic!("expected completed cycle, got {other:?}"),
    }
}

#[tokio::test]
async fn test_take_profit_closes_position() {
    let h = harness(
        ScriptedSignals::silent(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );
    h.engine
        .submit_manual(manual_equity_proposal(market_open_time()))
        .await
        .unwrap();

    h.market.set_quote("AAPL", dec!(116));
    h.clock.advance(Duration::minutes(5));

    match h.engine.tick().await {
        CycleOutcome::Completed(report) => assert_eq!(report.exits, 1),
        other => panic!("expected completed cycle, got {other:?}"),
    }
    let snapshot = h.engine.snapshot().await;
    assert_eq!(snapshot.realized_pnl, dec!(1600));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_cycle_is_refused_as_noop() {
    let mut slow = ScriptedSignals::strong_long();
    slow.delay_ms = 200;
    let h = harness(
        slow,
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.run_cycle(market_open_time()).await });

    // Give the first cycle time to take the guard
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let second = h.engine.run_cycle(market_open_time()).await;
    assert!(matches!(second, CycleOutcome::Skipped));

    let first = first.await.unwrap();
    assert!(matches!(first, CycleOutcome::Completed(_)));

    // Only the first cycle's trade landed
    assert_eq!(h.store.trades.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_manual_override_goes_through_risk_path() {
    let h = harness(
        ScriptedSignals::silent(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    // First manual entry is accepted and applied
    let decision = h
        .engine
        .submit_manual(manual_equity_proposal(market_open_time()))
        .await
        .unwrap();
    assert!(decision.is_accepted());
    assert!(h.engine.snapshot().await.has_position("AAPL", StrategySlot::Equity));

    // Second one for the same slot is rejected by the risk manager, not
    // errored
    let decision = h
        .engine
        .submit_manual(manual_equity_proposal(market_open_time()))
        .await
        .unwrap();
    match decision {
        RiskDecision::Rejected(Rejection::SlotOccupied { .. }) => {}
        other => panic!("expected SlotOccupied rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_manual_override_gated_to_market_hours() {
    let h = harness(
        ScriptedSignals::silent(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_closed_time(),
    );

    let result = h
        .engine
        .submit_manual(manual_equity_proposal(market_closed_time()))
        .await;
    assert!(result.is_err());
    assert!(h.store.trades.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_clock_skew_skips_the_tick() {
    let h = harness(
        ScriptedSignals::strong_long(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    assert!(matches!(
        h.engine.tick().await,
        CycleOutcome::Completed(_)
    ));

    // Clock jumps backwards: the next scheduled run is skipped, not run
    h.clock.set(market_open_time() - Duration::minutes(10));
    assert!(matches!(h.engine.tick().await, CycleOutcome::Fault(_)));
}

#[tokio::test]
async fn test_shutdown_reaches_stopped_state() {
    let h = harness(
        ScriptedSignals::silent(),
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    h.engine.shutdown();
    assert!(matches!(h.engine.tick().await, CycleOutcome::Stopped));
    assert_eq!(h.engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_snapshot_reads_do_not_require_cycle_completion() {
    let mut slow = ScriptedSignals::strong_long();
    slow.delay_ms = 200;
    let h = harness(
        slow,
        ScriptedMarket::new(&[("AAPL", dec!(100))]),
        market_open_time(),
    );

    let engine = h.engine.clone();
    let cycle = tokio::spawn(async move { engine.run_cycle(market_open_time()).await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    // Mid-cycle read sees the last committed state immediately
    let snapshot = h.engine.snapshot().await;
    assert_eq!(snapshot.cash, snapshot.initial_capital);

    cycle.await.unwrap();
}
