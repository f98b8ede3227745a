//! Bulk rate refresh over the tracked currencies

use crate::core::backend::WatchlistBackend;
use crate::core::catalog::Catalog;
use crate::core::rates::{ANCHOR_CURRENCY, RateCache, RateProvider};
use crate::core::watchlist::{WatchlistEntry, WatchlistStore};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub requested: Vec<String>,
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    /// Tracked codes the provider did not answer for.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshResult {
    NothingToRefresh,
    Refreshed(RefreshReport),
}

/// Symbols to request for `snapshot`: tracked codes plus the anchor,
/// restricted to codes the provider can be asked about.
pub fn refresh_symbols(snapshot: &[WatchlistEntry], catalog: &Catalog) -> Vec<String> {
    snapshot
        .iter()
        .map(|e| e.code.as_str())
        .chain(std::iter::once(ANCHOR_CURRENCY))
        .filter(|code| catalog.is_refreshable(code))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub struct RefreshOrchestrator<'a> {
    catalog: &'a Catalog,
    provider: &'a dyn RateProvider,
    backend: &'a dyn WatchlistBackend,
}

impl<'a> RefreshOrchestrator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        provider: &'a dyn RateProvider,
        backend: &'a dyn WatchlistBackend,
    ) -> Self {
        Self {
            catalog,
            provider,
            backend,
        }
    }

    /// Fetches rates for `snapshot` in a single provider call, then persists
    /// every returned rate concurrently. Each entry is written to `store` only
    /// once the backend echoes it back; a failed entry keeps its old values.
    ///
    /// Errors only when the provider call itself fails, in which case neither
    /// `store` nor `rates` is touched.
    #[instrument(name = "RefreshRates", skip_all, fields(entries = snapshot.len()))]
    pub async fn run(
        &self,
        snapshot: &[WatchlistEntry],
        store: &Mutex<WatchlistStore>,
        rates: &Mutex<RateCache>,
    ) -> Result<RefreshResult> {
        if snapshot.is_empty() {
            debug!("Watchlist is empty");
            return Ok(RefreshResult::NothingToRefresh);
        }

        let symbols = refresh_symbols(snapshot, self.catalog);
        if symbols.is_empty() {
            debug!("No valid symbols to refresh");
            return Ok(RefreshResult::NothingToRefresh);
        }

        debug!(symbols = %symbols.join(","), "Requesting rates");
        let fetched = self
            .provider
            .fetch_rates(&symbols)
            .await
            .context("Failed to fetch rates")?;

        rates.lock().await.record_anchor_observation(&fetched);

        let (to_update, missing): (Vec<&WatchlistEntry>, Vec<&WatchlistEntry>) = snapshot
            .iter()
            .partition(|e| fetched.contains_key(&e.code));

        let mut report = RefreshReport {
            requested: symbols,
            missing: missing.into_iter().map(|e| e.code.clone()).collect(),
            ..Default::default()
        };

        let update_futures = to_update.into_iter().map(|entry| {
            let rate = fetched[&entry.code];
            let code = entry.code.as_str();
            async move {
                match self.backend.update_rate(code, rate).await {
                    Ok(echoed) => {
                        debug!(code, rate = ?echoed.rate_usd, "Rate persisted");
                        store
                            .lock()
                            .await
                            .set_rate(code, echoed.rate_usd, echoed.updated_at);
                        (code, true)
                    }
                    Err(e) => {
                        warn!(code, error = %e, "Failed to persist rate, keeping previous value");
                        (code, false)
                    }
                }
            }
        });

        for (code, ok) in join_all(update_futures).await {
            if ok {
                report.updated.push(code.to_string());
            } else {
                report.failed.push(code.to_string());
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            missing = report.missing.len(),
            "Refresh finished"
        );
        Ok(RefreshResult::Refreshed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::RemoteList;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn entry(code: &str, rate: Option<&str>) -> WatchlistEntry {
        WatchlistEntry {
            code: code.to_string(),
            name: code.to_string(),
            rate_usd: rate.map(dec),
            updated_at: None,
        }
    }

    struct FixedRates {
        rates: HashMap<String, Decimal>,
        calls: AtomicUsize,
    }

    impl FixedRates {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                rates: pairs.iter().map(|(k, v)| (k.to_string(), dec(v))).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RateProvider for FixedRates {
        async fn fetch_rates(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rates
                .iter()
                .filter(|(k, _)| symbols.contains(k))
                .map(|(k, v)| (k.clone(), *v))
                .collect())
        }
    }

    struct FailingRates;

    #[async_trait]
    impl RateProvider for FailingRates {
        async fn fetch_rates(&self, _symbols: &[String]) -> Result<HashMap<String, Decimal>> {
            Err(anyhow!("connection refused"))
        }
    }

    /// Echoes updates back with a fixed server timestamp, failing for `fail`.
    struct EchoBackend {
        fail: Vec<&'static str>,
        updates: AtomicUsize,
    }

    impl EchoBackend {
        fn new(fail: Vec<&'static str>) -> Self {
            Self {
                fail,
                updates: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WatchlistBackend for EchoBackend {
        async fn fetch_all(&self) -> Result<RemoteList> {
            Ok(RemoteList::Empty)
        }

        async fn create(&self, code: &str) -> Result<WatchlistEntry> {
            Ok(entry(code, None))
        }

        async fn delete(&self, _code: &str) -> Result<()> {
            Ok(())
        }

        async fn update_rate(&self, code: &str, rate_usd: Decimal) -> Result<WatchlistEntry> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(&code) {
                return Err(anyhow!("HTTP error: 500"));
            }
            Ok(WatchlistEntry {
                code: code.to_string(),
                name: code.to_string(),
                rate_usd: Some(rate_usd),
                updated_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
            })
        }
    }

    fn store_of(entries: &[WatchlistEntry]) -> Mutex<WatchlistStore> {
        let mut store = WatchlistStore::new();
        store.replace_all(entries.to_vec());
        Mutex::new(store)
    }

    #[test]
    fn test_refresh_symbols_adds_anchor_and_filters() {
        let catalog = Catalog::default();
        let snapshot = vec![
            entry("EUR", None),
            entry("BTC", None),
            entry("xx1", None),
            entry("DOGE", None),
        ];
        assert_eq!(refresh_symbols(&snapshot, &catalog), vec!["BRL", "BTC", "EUR"]);
    }

    #[tokio::test]
    async fn test_refresh_updates_returned_entries_and_resets_anchor() {
        let catalog = Catalog::default();
        let snapshot = vec![entry("EUR", None), entry("BTC", Some("50000"))];
        let store = store_of(&snapshot);
        let rates = Mutex::new(RateCache::new());
        rates
            .lock()
            .await
            .record_anchor_observation(&HashMap::from([("BRL".to_string(), dec("5.5"))]));

        let provider = FixedRates::new(&[("EUR", "0.9"), ("BTC", "45000")]);
        let backend = EchoBackend::new(vec![]);
        let orchestrator = RefreshOrchestrator::new(&catalog, &provider, &backend);

        let result = orchestrator.run(&snapshot, &store, &rates).await.unwrap();
        let RefreshResult::Refreshed(report) = result else {
            panic!("Expected a refresh");
        };
        assert_eq!(report.requested, vec!["BRL", "BTC", "EUR"]);
        assert_eq!(report.updated.len(), 2);

        let store = store.lock().await;
        assert_eq!(store.get("EUR").unwrap().rate_usd, Some(dec("0.9")));
        assert_eq!(store.get("BTC").unwrap().rate_usd, Some(dec("45000")));
        assert!(store.get("BTC").unwrap().updated_at.is_some());

        let rates = rates.lock().await;
        assert_eq!(rates.anchor_rate(), None);
        for e in store.snapshot() {
            assert_eq!(rates.convert(e.rate_usd, "BRL"), None);
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_previous_value() {
        let catalog = Catalog::default();
        let snapshot = vec![entry("EUR", Some("0.8")), entry("BTC", Some("50000"))];
        let store = store_of(&snapshot);
        let rates = Mutex::new(RateCache::new());

        let provider = FixedRates::new(&[("EUR", "0.9"), ("BTC", "45000"), ("BRL", "5.0")]);
        let backend = EchoBackend::new(vec!["BTC"]);
        let orchestrator = RefreshOrchestrator::new(&catalog, &provider, &backend);

        let result = orchestrator.run(&snapshot, &store, &rates).await.unwrap();
        let RefreshResult::Refreshed(report) = result else {
            panic!("Expected a refresh");
        };
        assert_eq!(report.updated, vec!["EUR"]);
        assert_eq!(report.failed, vec!["BTC"]);
        assert_eq!(backend.updates.load(Ordering::SeqCst), 2);

        let store = store.lock().await;
        assert_eq!(store.get("EUR").unwrap().rate_usd, Some(dec("0.9")));
        assert_eq!(store.get("BTC").unwrap().rate_usd, Some(dec("50000")));
        assert_eq!(store.get("BTC").unwrap().updated_at, None);
        assert_eq!(rates.lock().await.anchor_rate(), Some(dec("5.0")));
    }

    #[tokio::test]
    async fn test_missing_symbol_left_untouched() {
        let catalog = Catalog::default();
        let snapshot = vec![entry("EUR", Some("0.8")), entry("ARS", Some("900"))];
        let store = store_of(&snapshot);
        let rates = Mutex::new(RateCache::new());

        let provider = FixedRates::new(&[("EUR", "0.9")]);
        let backend = EchoBackend::new(vec![]);
        let orchestrator = RefreshOrchestrator::new(&catalog, &provider, &backend);

        let result = orchestrator.run(&snapshot, &store, &rates).await.unwrap();
        let RefreshResult::Refreshed(report) = result else {
            panic!("Expected a refresh");
        };
        assert_eq!(report.missing, vec!["ARS"]);
        assert_eq!(backend.updates.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.lock().await.get("ARS").unwrap().rate_usd,
            Some(dec("900"))
        );
    }

    /// Holds the BTC update until the EUR update has been received, so the
    /// refresh only finishes when both are in flight together.
    struct HandoffBackend {
        eur_seen: Notify,
    }

    #[async_trait]
    impl WatchlistBackend for HandoffBackend {
        async fn fetch_all(&self) -> Result<RemoteList> {
            Ok(RemoteList::Empty)
        }

        async fn create(&self, code: &str) -> Result<WatchlistEntry> {
            Ok(entry(code, None))
        }

        async fn delete(&self, _code: &str) -> Result<()> {
            Ok(())
        }

        async fn update_rate(&self, code: &str, rate_usd: Decimal) -> Result<WatchlistEntry> {
            let hour = match code {
                "BTC" => {
                    self.eur_seen.notified().await;
                    10
                }
                _ => {
                    self.eur_seen.notify_one();
                    11
                }
            };
            Ok(WatchlistEntry {
                code: code.to_string(),
                name: code.to_string(),
                rate_usd: Some(rate_usd),
                updated_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, hour, 0, 0).unwrap()),
            })
        }
    }

    #[tokio::test]
    async fn test_entry_updates_run_concurrently() {
        let catalog = Catalog::default();
        let snapshot = vec![entry("BTC", None), entry("EUR", None)];
        let store = store_of(&snapshot);
        let rates = Mutex::new(RateCache::new());

        let provider = FixedRates::new(&[("EUR", "0.9"), ("BTC", "45000")]);
        let backend = HandoffBackend {
            eur_seen: Notify::new(),
        };
        let orchestrator = RefreshOrchestrator::new(&catalog, &provider, &backend);

        let result = timeout(
            Duration::from_secs(2),
            orchestrator.run(&snapshot, &store, &rates),
        )
        .await
        .expect("Entry updates did not overlap")
        .unwrap();
        let RefreshResult::Refreshed(report) = result else {
            panic!("Expected a refresh");
        };
        assert_eq!(report.updated, vec!["BTC", "EUR"]);

        let store = store.lock().await;
        let btc = store.get("BTC").unwrap();
        let eur = store.get("EUR").unwrap();
        assert_eq!(btc.rate_usd, Some(dec("45000")));
        assert_eq!(btc.updated_at, Some(Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap()));
        assert_eq!(eur.rate_usd, Some(dec("0.9")));
        assert_eq!(eur.updated_at, Some(Utc.with_ymd_and_hms(2025, 1, 2, 11, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_empty_watchlist_skips_network() {
        let catalog = Catalog::default();
        let store = Mutex::new(WatchlistStore::new());
        let rates = Mutex::new(RateCache::new());
        let provider = FixedRates::new(&[("BRL", "5.0")]);
        let backend = EchoBackend::new(vec![]);
        let orchestrator = RefreshOrchestrator::new(&catalog, &provider, &backend);

        let result = orchestrator.run(&[], &store, &rates).await.unwrap();
        assert_eq!(result, RefreshResult::NothingToRefresh);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_state() {
        let catalog = Catalog::default();
        let snapshot = vec![entry("EUR", Some("0.8"))];
        let store = store_of(&snapshot);
        let rates = Mutex::new(RateCache::new());
        rates
            .lock()
            .await
            .record_anchor_observation(&HashMap::from([("BRL".to_string(), dec("5.5"))]));
        let backend = EchoBackend::new(vec![]);
        let orchestrator = RefreshOrchestrator::new(&catalog, &FailingRates, &backend);

        let result = orchestrator.run(&snapshot, &store, &rates).await;
        assert!(result.is_err());
        assert_eq!(rates.lock().await.anchor_rate(), Some(dec("5.5")));
        assert_eq!(
            store.lock().await.get("EUR").unwrap().rate_usd,
            Some(dec("0.8"))
        );
        assert_eq!(backend.updates.load(Ordering::SeqCst), 0);
    }
}
