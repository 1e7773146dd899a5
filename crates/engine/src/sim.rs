//! Simulated feed - deterministic providers for demos and tests
//!
//! Generates signals, quotes, and synthetic option chains without any
//! network dependency:
//! - Signals are derived from (seed, symbol, timestamp), so the
//!   idempotency contract of the signal port holds: asking twice for the
//!   same cycle returns the same answer.
//! - Quotes follow a seeded random walk per symbol.
//! - Chains are built around the current spot with a coarse
//!   intrinsic-plus-time-value premium model.

use async_trait::async_trait;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sextant_core::{ChainSnapshot, OptionQuote, OptionType, Signal, SignalSource, Timestamp};
use sextant_ports::{MarketDataProvider, ProviderError, ProviderResult, SignalProvider};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;

/// Configuration for the simulated feed
#[derive(Debug, Clone)]
pub struct SimulatedFeedConfig {
    /// Starting prices per symbol
    pub initial_prices: HashMap<String, Decimal>,
    /// Random-walk step size as a fraction of price per quote
    pub price_volatility: Decimal,
    /// Implied vol reported on every chain
    pub implied_vol: Decimal,
    /// Strike grid spacing
    pub strike_step: Decimal,
    /// Strikes generated on each side of spot
    pub strikes_per_side: u32,
    /// Days until the single synthetic expiry
    pub expiry_days: i64,
}

impl Default for SimulatedFeedConfig {
    fn default() -> Self {
        let mut initial_prices = HashMap::new();
        initial_prices.insert("AAPL".to_string(), dec!(190));
        initial_prices.insert("MSFT".to_string(), dec!(410));
        initial_prices.insert("NVDA".to_string(), dec!(880));
        initial_prices.insert("AMZN".to_string(), dec!(180));
        initial_prices.insert("GOOG".to_string(), dec!(170));

        Self {
            initial_prices,
            price_volatility: dec!(0.002),
            implied_vol: dec!(0.30),
            strike_step: dec!(5),
            strikes_per_side: 4,
            expiry_days: 45,
        }
    }
}

/// Simulated signal and market-data provider
pub struct SimulatedFeed {
    config: SimulatedFeedConfig,
    seed: u64,
    /// Current prices per symbol, drifting on each quote
    prices: Mutex<HashMap<String, Decimal>>,
    walk_rng: Mutex<StdRng>,
}

impl SimulatedFeed {
    pub fn new(config: SimulatedFeedConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Create with a specific seed for reproducible runs
    pub fn with_seed(config: SimulatedFeedConfig, seed: u64) -> Self {
        let prices = config.initial_prices.clone();
        Self {
            config,
            seed,
            prices: Mutex::new(prices),
            walk_rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Deterministic per-(symbol, timestamp) generator
    fn cycle_rng(&self, symbol: &str, timestamp: Timestamp) -> StdRng {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        timestamp.timestamp().hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }

    fn spot(&self, symbol: &str) -> ProviderResult<Decimal> {
        self.prices
            .lock()
            .expect("price lock poisoned")
            .get(symbol)
            .copied()
            .ok_or_else(|| ProviderError::unavailable(symbol, "unknown symbol"))
    }

    /// Coarse premium: intrinsic value plus a time value that decays with
    /// distance from the money
    fn premium(&self, spot: Decimal, strike: Decimal, option_type: OptionType) -> Decimal {
        let intrinsic = match option_type {
            OptionType::Call => (spot - strike).max(Decimal::ZERO),
            OptionType::Put => (strike - spot).max(Decimal::ZERO),
        };
        let atm_time_value = spot * self.config.implied_vol * dec!(0.08);
        let time_value = (atm_time_value - (strike - spot).abs() * dec!(0.15)).max(dec!(0.05));
        intrinsic + time_value
    }
}

#[async_trait]
impl SignalProvider for SimulatedFeed {
    async fn signals(&self, symbol: &str, timestamp: Timestamp) -> ProviderResult<Vec<Signal>> {
        // Unknown symbols have no feed
        self.spot(symbol)?;

        let mut rng = self.cycle_rng(symbol, timestamp);
        let sources = [
            SignalSource::Technical,
            SignalSource::OptionsFlow,
            SignalSource::AnalystRating,
        ];

        let signals = sources
            .iter()
            .map(|&source| {
                let value = Decimal::from_f64_retain(rng.gen_range(-1.0..1.0))
                    .unwrap_or(Decimal::ZERO)
                    .round_dp(4);
                let confidence = Decimal::from_f64_retain(rng.gen_range(0.5..1.0))
                    .unwrap_or(dec!(0.5))
                    .round_dp(4);
                Signal::new(source, symbol, value, confidence, timestamp)
            })
            .collect();
        Ok(signals)
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedFeed {
    async fn quote(&self, symbol: &str) -> ProviderResult<Decimal> {
        let mut prices = self.prices.lock().expect("price lock poisoned");
        let Some(price) = prices.get_mut(symbol) else {
            return Err(ProviderError::unavailable(symbol, "unknown symbol"));
        };

        let mut rng = self.walk_rng.lock().expect("rng lock poisoned");
        let step: f64 = rng.gen_range(-1.0..1.0);
        let drift = Decimal::from_f64_retain(step).unwrap_or(Decimal::ZERO)
            * self.config.price_volatility
            * *price;
        *price = (*price + drift).max(dec!(0.01)).round_dp(2);
        Ok(*price)
    }

    async fn options_context(&self, symbol: &str) -> ProviderResult<ChainSnapshot> {
        let spot = self.spot(symbol)?;
        let expiry = (chrono::Utc::now() + Duration::days(self.config.expiry_days)).date_naive();

        // Strike grid centered on spot, snapped to the step
        let center = (spot / self.config.strike_step).round() * self.config.strike_step;
        let mut quotes = Vec::new();
        let side = self.config.strikes_per_side as i64;
        for i in -side..=side {
            let strike = center + Decimal::from(i) * self.config.strike_step;
            if strike <= Decimal::ZERO {
                continue;
            }
            for option_type in [OptionType::Call, OptionType::Put] {
                quotes.push(OptionQuote {
                    option_type,
                    strike,
                    expiry,
                    last_price: self.premium(spot, strike, option_type).round_dp(2),
                });
            }
        }

        Ok(ChainSnapshot {
            symbol: symbol.to_string(),
            spot,
            implied_vol: self.config.implied_vol,
            atr: Some((spot * dec!(0.015)).round_dp(2)),
            expiries: vec![expiry],
            quotes,
        })
    }
}
