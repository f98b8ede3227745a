//! In-memory watchlist. Pure state, no I/O.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub code: String,
    pub name: String,
    /// Units of this currency per US dollar; `None` when unknown.
    pub rate_usd: Option<Decimal>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WatchlistEntry {
    /// A freshly tracked entry with no rate yet.
    pub fn untracked_rate(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            rate_usd: None,
            updated_at: None,
        }
    }
}

/// Ordered list of tracked entries, unique by code.
#[derive(Debug, Clone, Default)]
pub struct WatchlistStore {
    entries: Vec<WatchlistEntry>,
}

impl WatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk overwrite after a successful remote load. Later duplicates of a
    /// code are dropped.
    pub fn replace_all(&mut self, entries: Vec<WatchlistEntry>) {
        self.entries.clear();
        for entry in entries {
            self.add(entry);
        }
    }

    /// Appends `entry`. Returns false, leaving the store unchanged, when the
    /// code is already tracked.
    pub fn add(&mut self, mut entry: WatchlistEntry) -> bool {
        if self.contains(&entry.code) {
            return false;
        }
        entry.rate_usd = entry.rate_usd.filter(|r| !r.is_sign_negative());
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, code: &str) -> Option<WatchlistEntry> {
        let index = self.entries.iter().position(|e| e.code == code)?;
        Some(self.entries.remove(index))
    }

    /// Updates the rate of `code`; no-op when the code is not tracked.
    pub fn set_rate(
        &mut self,
        code: &str,
        rate_usd: Option<Decimal>,
        updated_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.entries.iter_mut().find(|e| e.code == code) {
            Some(entry) => {
                entry.rate_usd = rate_usd.filter(|r| !r.is_sign_negative());
                entry.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    pub fn get(&self, code: &str) -> Option<&WatchlistEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the entries in insertion order.
    pub fn snapshot(&self) -> Vec<WatchlistEntry> {
        self.entries.clone()
    }
}
