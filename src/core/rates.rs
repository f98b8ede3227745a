//! Rate provider abstraction and the anchor-rate conversion cache.
//!
//! Every watchlist rate is stored as the price of one US dollar in the
//! tracked currency. The only alternate display base is the anchor currency
//! (BRL), derived from the cached anchor rate without further requests.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

pub const USD: &str = "USD";
pub const ANCHOR_CURRENCY: &str = "BRL";
pub const DISPLAY_SCALE: u32 = 6;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches USD rates for all `symbols` in one request. Symbols missing
    /// from the provider's answer are absent from the returned map.
    async fn fetch_rates(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DisplayBase {
    #[default]
    Usd,
    Brl,
}

impl DisplayBase {
    pub fn code(&self) -> &'static str {
        match self {
            DisplayBase::Usd => USD,
            DisplayBase::Brl => ANCHOR_CURRENCY,
        }
    }
}

impl Display for DisplayBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for DisplayBase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(DisplayBase::Usd),
            "BRL" => Ok(DisplayBase::Brl),
            _ => Err(anyhow::anyhow!("Unsupported display base: {}", s)),
        }
    }
}

impl TryFrom<String> for DisplayBase {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayBase> for String {
    fn from(base: DisplayBase) -> Self {
        base.code().to_string()
    }
}

/// Rounds a converted rate to the fixed display precision.
pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Holds the last observed USD rate of the anchor currency.
#[derive(Debug, Clone, Default)]
pub struct RateCache {
    anchor_rate: Option<Decimal>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor_rate(&self) -> Option<Decimal> {
        self.anchor_rate
    }

    /// Records the anchor rate from a provider answer. An answer without the
    /// anchor resets it to unknown rather than keeping the stale value.
    pub fn record_anchor_observation(&mut self, rates: &HashMap<String, Decimal>) {
        self.anchor_rate = rates.get(ANCHOR_CURRENCY).copied();
        match self.anchor_rate {
            Some(rate) => debug!(anchor = ANCHOR_CURRENCY, %rate, "Anchor rate recorded"),
            None => debug!(anchor = ANCHOR_CURRENCY, "Anchor rate not returned, reset"),
        }
    }

    /// Converts a stored USD rate into `base`. Only USD and the anchor
    /// currency are supported; anything else is unknown.
    pub fn convert(&self, rate_usd: Option<Decimal>, base: &str) -> Option<Decimal> {
        let rate_usd = rate_usd?;
        if base == USD {
            return Some(round_for_display(rate_usd));
        }
        if base != ANCHOR_CURRENCY || rate_usd.is_zero() {
            return None;
        }
        // Units of anchor per one unit of the tracked currency
        self.anchor_rate
            .filter(|anchor| !anchor.is_zero())?
            .checked_div(rate_usd)
            .map(round_for_display)
    }
}
