//! Sextant - automated paper-trading engine
//!
//! Runs the decision pipeline on a recurring schedule against the
//! simulated feed, persisting trades and portfolio snapshots under
//! `data/`.

use log::{error, info};
use sextant_clock::SystemClock;
use sextant_engine::{EngineConfig, JsonlTradeStore, SimulatedFeed, SimulatedFeedConfig, TradingEngine};
use sextant_ports::WeekdayCalendar;
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"Sextant - automated paper-trading engine

USAGE:
    sextant [OPTIONS]

OPTIONS:
    --config <PATH>     Load engine configuration from a JSON file
    --data <DIR>        Directory for trade log and snapshots (default: data)
    --seed <N>          Seed for the simulated feed (default: random)
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut data_dir = "data".to_string();
    let mut seed: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                config_path = Some(
                    args.get(i)
                        .cloned()
                        .ok_or("--config requires a path argument")?,
                );
            }
            "--data" => {
                i += 1;
                data_dir = args.get(i).cloned().ok_or("--data requires a directory")?;
            }
            "--seed" => {
                i += 1;
                seed = Some(
                    args.get(i)
                        .ok_or("--seed requires a number")?
                        .parse::<u64>()?,
                );
            }
            arg => {
                eprintln!("Unknown argument: {arg}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => EngineConfig::from_file(&path)?,
        None => EngineConfig::default(),
    };

    let mut feed_config = SimulatedFeedConfig::default();
    for symbol in &config.universe {
        feed_config
            .initial_prices
            .entry(symbol.clone())
            .or_insert(rust_decimal_macros::dec!(100));
    }
    let feed = Arc::new(match seed {
        Some(seed) => SimulatedFeed::with_seed(feed_config, seed),
        None => SimulatedFeed::new(feed_config),
    });

    let store = Arc::new(JsonlTradeStore::open(&data_dir)?);
    let engine = Arc::new(TradingEngine::new(
        config,
        feed.clone(),
        feed,
        Arc::new(WeekdayCalendar::default()),
        Arc::new(SystemClock::new()),
        store,
    ));

    let runner = engine.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => error!("failed to listen for shutdown signal: {e}"),
    }
    engine.shutdown();
    handle.await?;

    let metrics = engine.metrics().await;
    info!(
        "final: {} trades, win rate {:.1}%, realized pnl {}",
        metrics.total_trades, metrics.win_rate, metrics.realized_pnl
    );
    Ok(())
}
