use crate::error::StoreResult;
use async_trait::async_trait;
use sextant_core::{Portfolio, TradeRecord};

/// Port for durable persistence of trade history and portfolio snapshots
///
/// The engine requires at-least-once durability for trade records: a crash
/// after apply but before persist is recovered by replaying the ledger,
/// and implementations must treat a re-persisted record id as a no-op.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Append one trade record. Idempotent per `record.id`.
    async fn persist_trade(&self, record: &TradeRecord) -> StoreResult<()>;

    /// Overwrite the latest portfolio snapshot
    async fn persist_snapshot(&self, portfolio: &Portfolio) -> StoreResult<()>;
}
