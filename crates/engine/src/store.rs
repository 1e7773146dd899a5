//! Trade store adapters
//!
//! [`JsonlTradeStore`] appends trade records as JSON lines and overwrites a
//! snapshot file per cycle. Record ids already present in the file are
//! skipped on re-persist, which makes crash-recovery replay idempotent.
//! [`NullTradeStore`] discards everything; tests that don't care about
//! persistence use it.

use async_trait::async_trait;
use sextant_core::{Portfolio, TradeRecord};
use sextant_ports::{StoreError, StoreResult, TradeStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Append-only JSON-lines trade log plus a latest-snapshot file
pub struct JsonlTradeStore {
    trades_path: PathBuf,
    snapshot_path: PathBuf,
    /// Record ids already durable, for idempotent re-persist
    seen: Mutex<HashSet<u64>>,
}

impl JsonlTradeStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// Existing trade records are scanned so replayed ids are recognized.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let trades_path = dir.join("trades.jsonl");
        let snapshot_path = dir.join("portfolio.json");

        let mut seen = HashSet::new();
        if trades_path.exists() {
            let content = std::fs::read_to_string(&trades_path)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let record: TradeRecord = serde_json::from_str(line)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                seen.insert(record.id);
            }
        }

        Ok(Self {
            trades_path,
            snapshot_path,
            seen: Mutex::new(seen),
        })
    }

    /// Read the full persisted ledger back, in file order
    pub fn load_trades(&self) -> StoreResult<Vec<TradeRecord>> {
        if !self.trades_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.trades_path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl TradeStore for JsonlTradeStore {
    async fn persist_trade(&self, record: &TradeRecord) -> StoreResult<()> {
        {
            let seen = self.seen.lock().expect("seen lock poisoned");
            if seen.contains(&record.id) {
                return Ok(());
            }
        }

        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.trades_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        self.seen.lock().expect("seen lock poisoned").insert(record.id);
        Ok(())
    }

    async fn persist_snapshot(&self, portfolio: &Portfolio) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(portfolio)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.snapshot_path, json).await?;
        Ok(())
    }
}

/// Store that discards everything
pub struct NullTradeStore;

#[async_trait]
impl TradeStore for NullTradeStore {
    async fn persist_trade(&self, _record: &TradeRecord) -> StoreResult<()> {
        Ok(())
    }

    async fn persist_snapshot(&self, _portfolio: &Portfolio) -> StoreResult<()> {
        Ok(())
    }
}
