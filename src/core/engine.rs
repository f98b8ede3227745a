//! Watchlist workflows: load, add, remove and refresh.
//!
//! Every workflow that mutates the watchlist or talks to the backend runs
//! behind the [`OperationLatch`]; a request arriving while another workflow
//! is in flight is dropped without side effects. Local changes are committed
//! before the backend is told about them and are never rolled back.

use crate::core::backend::{RemoteList, WatchlistBackend};
use crate::core::catalog::{Catalog, CatalogEntry};
use crate::core::latch::OperationLatch;
use crate::core::rates::{ANCHOR_CURRENCY, DisplayBase, RateCache, RateProvider};
use crate::core::refresh::{RefreshOrchestrator, RefreshResult};
use crate::core::render::{DisplayCard, UserIntent, WatchlistRenderer};
use crate::core::watchlist::{WatchlistEntry, WatchlistStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed,
    /// Another workflow held the latch; nothing happened.
    Busy,
    /// The request was invalid and was refused before any I/O.
    Rejected(String),
    /// A remote collaborator was unreachable; local state was kept.
    Offline,
}

pub struct WatchlistEngine {
    catalog: Catalog,
    store: Mutex<WatchlistStore>,
    rates: Mutex<RateCache>,
    base: Mutex<DisplayBase>,
    latch: OperationLatch,
    backend: Arc<dyn WatchlistBackend>,
    provider: Arc<dyn RateProvider>,
    renderer: Arc<dyn WatchlistRenderer>,
}

impl WatchlistEngine {
    pub fn new(
        catalog: Catalog,
        backend: Arc<dyn WatchlistBackend>,
        provider: Arc<dyn RateProvider>,
        renderer: Arc<dyn WatchlistRenderer>,
        base: DisplayBase,
    ) -> Self {
        Self {
            catalog,
            store: Mutex::new(WatchlistStore::new()),
            rates: Mutex::new(RateCache::new()),
            base: Mutex::new(base),
            latch: OperationLatch::new(),
            backend,
            provider,
            renderer,
        }
    }

    pub fn latch(&self) -> &OperationLatch {
        &self.latch
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn snapshot(&self) -> Vec<WatchlistEntry> {
        self.store.lock().await.snapshot()
    }

    pub async fn anchor_rate(&self) -> Option<Decimal> {
        self.rates.lock().await.anchor_rate()
    }

    pub async fn display_base(&self) -> DisplayBase {
        *self.base.lock().await
    }

    pub async fn available(&self) -> Vec<CatalogEntry> {
        let store = self.store.lock().await;
        self.catalog.available(store.codes())
    }

    /// Watchlist converted to the current display base.
    pub async fn cards(&self) -> Vec<DisplayCard> {
        let base = self.display_base().await;
        let store = self.store.lock().await;
        let rates = self.rates.lock().await;
        store
            .snapshot()
            .iter()
            .map(|e| DisplayCard::from_entry(e, &rates, base))
            .collect()
    }

    pub async fn redraw(&self) {
        let base = self.display_base().await;
        let cards = self.cards().await;
        let available = self.available().await;
        self.renderer.render_cards(base, &cards);
        self.renderer.render_available(&available);
    }

    fn reject(&self, message: String) -> WorkflowOutcome {
        info!(%message, "Request rejected");
        self.renderer.notify(&message);
        WorkflowOutcome::Rejected(message)
    }

    /// Fetches the anchor rate alone so the alternate base works before the
    /// first refresh.
    #[instrument(skip(self))]
    pub async fn prime_anchor(&self) -> WorkflowOutcome {
        let symbols = [ANCHOR_CURRENCY.to_string()];
        match self.provider.fetch_rates(&symbols).await {
            Ok(fetched) if fetched.contains_key(ANCHOR_CURRENCY) => {
                self.rates.lock().await.record_anchor_observation(&fetched);
                WorkflowOutcome::Completed
            }
            Ok(_) => {
                debug!("Anchor rate not returned by provider");
                WorkflowOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch initial anchor rate");
                WorkflowOutcome::Offline
            }
        }
    }

    /// Replaces the watchlist with the persisted one. An empty or unreachable
    /// backend leaves the local watchlist as is.
    #[instrument(skip(self))]
    pub async fn load(&self) -> WorkflowOutcome {
        let Some(_guard) = self.latch.try_enter("load") else {
            return WorkflowOutcome::Busy;
        };

        let outcome = match self.backend.fetch_all().await {
            Ok(RemoteList::Entries(entries)) => {
                info!(count = entries.len(), "Loaded watchlist from backend");
                self.store.lock().await.replace_all(entries);
                WorkflowOutcome::Completed
            }
            Ok(RemoteList::Empty) => {
                info!("Backend has no watchlist, keeping local state");
                WorkflowOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Failed to load watchlist, running offline");
                WorkflowOutcome::Offline
            }
        };

        self.redraw().await;
        outcome
    }

    #[instrument(skip(self))]
    pub async fn add(&self, code: &str) -> WorkflowOutcome {
        let Some(_guard) = self.latch.try_enter("add") else {
            return WorkflowOutcome::Busy;
        };

        let Some(currency) = self.catalog.get(code) else {
            return self.reject(format!("Unknown currency code: {code}"));
        };
        let added = self
            .store
            .lock()
            .await
            .add(WatchlistEntry::untracked_rate(&currency.code, &currency.name));
        if !added {
            return self.reject(format!("{code} is already in the watchlist"));
        }
        self.redraw().await;

        match self.backend.create(code).await {
            Ok(entry) => {
                debug!(code = %entry.code, "Currency saved to backend");
                WorkflowOutcome::Completed
            }
            Err(e) => {
                warn!(code, error = %e, "Failed to save currency, keeping it locally");
                WorkflowOutcome::Offline
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, code: &str) -> WorkflowOutcome {
        let Some(_guard) = self.latch.try_enter("remove") else {
            return WorkflowOutcome::Busy;
        };

        if self.store.lock().await.remove(code).is_none() {
            return self.reject(format!("{code} is not in the watchlist"));
        }
        self.redraw().await;

        match self.backend.delete(code).await {
            Ok(()) => {
                debug!(code, "Currency removed from backend");
                WorkflowOutcome::Completed
            }
            Err(e) => {
                warn!(code, error = %e, "Failed to remove currency from backend, removed locally");
                WorkflowOutcome::Offline
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> WorkflowOutcome {
        let Some(_guard) = self.latch.try_enter("refresh") else {
            return WorkflowOutcome::Busy;
        };

        let snapshot = self.snapshot().await;
        let orchestrator = RefreshOrchestrator::new(
            &self.catalog,
            self.provider.as_ref(),
            self.backend.as_ref(),
        );

        let outcome = match orchestrator.run(&snapshot, &self.store, &self.rates).await {
            Ok(RefreshResult::NothingToRefresh) => {
                return self.reject("Nothing to refresh".to_string());
            }
            Ok(RefreshResult::Refreshed(report)) => {
                debug!(?report, "Rates refreshed");
                WorkflowOutcome::Completed
            }
            Err(e) => {
                warn!(error = ?e, "Rate refresh failed");
                WorkflowOutcome::Offline
            }
        };

        self.redraw().await;
        outcome
    }

    /// Switches the display base. Only re-renders, nothing is fetched.
    pub async fn change_base(&self, base: DisplayBase) -> WorkflowOutcome {
        *self.base.lock().await = base;
        debug!(%base, "Display base changed");
        self.redraw().await;
        WorkflowOutcome::Completed
    }

    pub async fn handle(&self, intent: UserIntent) -> WorkflowOutcome {
        match intent {
            UserIntent::SelectCurrency(code) => self.add(&code).await,
            UserIntent::RemoveCurrency(code) => self.remove(&code).await,
            UserIntent::RefreshRequested => self.refresh().await,
            UserIntent::BaseChanged(base) => self.change_base(base).await,
        }
    }
}
