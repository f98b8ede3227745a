//! Narrow interface to whatever draws the watchlist

use crate::core::catalog::CatalogEntry;
use crate::core::rates::{DISPLAY_SCALE, DisplayBase, RateCache, round_for_display};
use crate::core::watchlist::WatchlistEntry;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;

/// Timestamps are always shown at UTC-3, whatever the local timezone.
const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;
const UNKNOWN: &str = "---";

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCard {
    pub code: String,
    pub name: String,
    pub rate: Option<Decimal>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DisplayCard {
    pub fn from_entry(entry: &WatchlistEntry, rates: &RateCache, base: DisplayBase) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.name.clone(),
            rate: rates.convert(entry.rate_usd, base.code()),
            updated_at: entry.updated_at,
        }
    }

    pub fn rate_text(&self) -> String {
        format_rate(self.rate)
    }

    pub fn updated_text(&self) -> String {
        format_timestamp(self.updated_at)
    }
}

pub fn format_rate(rate: Option<Decimal>) -> String {
    rate.map_or_else(
        || UNKNOWN.to_string(),
        |r| format!("{:.*}", DISPLAY_SCALE as usize, round_for_display(r)),
    )
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    let Some(ts) = ts else {
        return UNKNOWN.to_string();
    };
    match FixedOffset::west_opt(DISPLAY_OFFSET_SECS) {
        Some(offset) => ts
            .with_timezone(&offset)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// User actions fed back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    SelectCurrency(String),
    RemoveCurrency(String),
    RefreshRequested,
    BaseChanged(DisplayBase),
}

pub trait WatchlistRenderer: Send + Sync {
    fn render_cards(&self, base: DisplayBase, cards: &[DisplayCard]);
    fn render_available(&self, available: &[CatalogEntry]);
    /// Blocking notice shown to the user, e.g. a rejected action.
    fn notify(&self, message: &str);
}
