//! Options-chain snapshot consumed by the strategy selector
//!
//! A read-only view of the chain for one symbol: spot, implied volatility,
//! available expiries, and per-strike quotes. Produced by an external
//! market-data provider; never mutated by the core.

use crate::instrument::OptionType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single option quote from the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    /// Last traded premium per share
    pub last_price: Decimal,
}

/// Snapshot of the options chain for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub symbol: String,
    /// Underlying last price
    pub spot: Decimal,
    /// At-the-money implied volatility (annualized, e.g. 0.25 = 25%)
    pub implied_vol: Decimal,
    /// Average true range of the underlying, when the feed supplies it
    pub atr: Option<Decimal>,
    /// Available expiries, ascending
    pub expiries: Vec<NaiveDate>,
    pub quotes: Vec<OptionQuote>,
}

impl ChainSnapshot {
    /// Distinct strikes within `width_pct` of spot, ascending
    pub fn strikes_within(&self, width_pct: Decimal) -> Vec<Decimal> {
        let lower = self.spot * (Decimal::ONE - width_pct);
        let upper = self.spot * (Decimal::ONE + width_pct);

        let mut strikes: Vec<Decimal> = self
            .quotes
            .iter()
            .filter(|q| q.strike >= lower && q.strike <= upper)
            .map(|q| q.strike)
            .collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    /// Look up a quote by (type, strike, expiry)
    pub fn quote(
        &self,
        option_type: OptionType,
        strike: Decimal,
        expiry: NaiveDate,
    ) -> Option<&OptionQuote> {
        self.quotes.iter().find(|q| {
            q.option_type == option_type && q.strike == strike && q.expiry == expiry
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> ChainSnapshot {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let quotes = [dec!(95), dec!(100), dec!(105), dec!(140)]
            .iter()
            .map(|&strike| OptionQuote {
                option_type: OptionType::Call,
                strike,
                expiry,
                last_price: dec!(2.50),
            })
            .collect();

        ChainSnapshot {
            symbol: "AAPL".to_string(),
            spot: dec!(100),
            implied_vol: dec!(0.30),
            atr: None,
            expiries: vec![expiry],
            quotes,
        }
    }

    #[test]
    fn test_strikes_within_width() {
        let chain = snapshot();
        let strikes = chain.strikes_within(dec!(0.05));
        assert_eq!(strikes, vec![dec!(95), dec!(100), dec!(105)]);
    }

    #[test]
    fn test_quote_lookup() {
        let chain = snapshot();
        let expiry = chain.expiries[0];
        assert!(chain.quote(OptionType::Call, dec!(100), expiry).is_some());
        assert!(chain.quote(OptionType::Put, dec!(100), expiry).is_none());
    }
}
