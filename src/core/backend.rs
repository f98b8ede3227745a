//! Remote persistence abstraction for the watchlist

use crate::core::watchlist::WatchlistEntry;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Answer of a full remote load.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteList {
    Entries(Vec<WatchlistEntry>),
    /// The service holds no data. Not an error.
    Empty,
}

/// Best-effort remote store. Callers log failures and carry on with local
/// state; nothing here is retried.
#[async_trait]
pub trait WatchlistBackend: Send + Sync {
    async fn fetch_all(&self) -> Result<RemoteList>;
    async fn create(&self, code: &str) -> Result<WatchlistEntry>;
    async fn delete(&self, code: &str) -> Result<()>;
    /// Persists `rate_usd`; the echoed entry carries the authoritative
    /// update time.
    async fn update_rate(&self, code: &str, rate_usd: Decimal) -> Result<WatchlistEntry>;
}
