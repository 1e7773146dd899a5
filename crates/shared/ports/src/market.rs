use crate::error::ProviderResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sextant_core::{ChainSnapshot, Signal, Timestamp};

/// Port for signal sources (technical, options-flow, analyst-rating)
///
/// Implementations must be idempotent per (symbol, timestamp) so cycles can
/// be replayed for testing and crash recovery.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// All signals available for a symbol at a cycle timestamp.
    ///
    /// An empty vec is a valid answer (no data this cycle); errors are
    /// reserved for feed failures.
    async fn signals(&self, symbol: &str, timestamp: Timestamp) -> ProviderResult<Vec<Signal>>;
}

/// Port for price and options-chain data
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Last/mark price for a symbol
    async fn quote(&self, symbol: &str) -> ProviderResult<Decimal>;

    /// Options-chain snapshot for volatility-regime classification and
    /// structure construction
    async fn options_context(&self, symbol: &str) -> ProviderResult<ChainSnapshot>;
}
