use super::util::{ensure_success, http_client, parse_decimal};
use crate::core::backend::{RemoteList, WatchlistBackend};
use crate::core::catalog::CatalogEntry;
use crate::core::watchlist::WatchlistEntry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Number, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// REST client for the watchlist persistence service.
pub struct WatchlistApi {
    base_url: String,
    client: Client,
}

impl WatchlistApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(WatchlistApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    fn currencies_url(&self) -> String {
        format!("{}/currencies", self.base_url)
    }

    fn currency_url(&self, code: &str) -> String {
        format!("{}/currencies/{}", self.base_url, code)
    }

    /// Currencies the service accepts, as published by the service itself.
    pub async fn fetch_allowed(&self) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/allowed-currencies", self.base_url);
        debug!("Requesting allowed currencies from {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;
        let response = ensure_success(response, "allowed currencies").await?;
        response
            .json::<Vec<CatalogEntry>>()
            .await
            .context("Failed to parse allowed currencies")
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyRecord {
    code: String,
    name: String,
    rate: Option<Number>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CurrencyListResponse {
    Entries(Vec<CurrencyRecord>),
    Message { message: String },
}

/// The service writes naive UTC timestamps; offsets are accepted too.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|ts| ts.and_utc())
        .with_context(|| format!("Invalid timestamp: {value}"))
}

/// Unreadable fields degrade to unknown so one bad row does not cost the
/// rest of the list.
impl From<CurrencyRecord> for WatchlistEntry {
    fn from(record: CurrencyRecord) -> Self {
        let rate_usd = match record.rate.as_ref().map(|n| parse_decimal(&n.to_string())) {
            Some(Ok(rate)) if rate.is_sign_negative() => {
                warn!(code = %record.code, %rate, "Ignoring negative rate");
                None
            }
            Some(Ok(rate)) => Some(rate),
            Some(Err(e)) => {
                warn!(code = %record.code, error = %e, "Ignoring unreadable rate");
                None
            }
            None => None,
        };
        let updated_at = match record.updated_at.as_deref() {
            Some(ts) => match parse_timestamp(ts) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    warn!(code = %record.code, error = %e, "Ignoring unreadable timestamp");
                    None
                }
            },
            None => None,
        };
        WatchlistEntry {
            code: record.code,
            name: record.name,
            rate_usd,
            updated_at,
        }
    }
}

#[async_trait]
impl WatchlistBackend for WatchlistApi {
    #[instrument(name = "BackendFetchAll", skip(self))]
    async fn fetch_all(&self) -> Result<RemoteList> {
        let url = self.currencies_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;
        let response = ensure_success(response, "watchlist").await?;
        let text = response.text().await?;

        let data: CurrencyListResponse =
            serde_json::from_str(&text).context("Failed to parse watchlist response")?;
        match data {
            CurrencyListResponse::Message { message } => {
                debug!(%message, "Backend reports an empty watchlist");
                Ok(RemoteList::Empty)
            }
            CurrencyListResponse::Entries(records) => Ok(RemoteList::Entries(
                records.into_iter().map(WatchlistEntry::from).collect(),
            )),
        }
    }

    #[instrument(name = "BackendCreate", skip(self))]
    async fn create(&self, code: &str) -> Result<WatchlistEntry> {
        let response = self
            .client
            .post(self.currencies_url())
            .json(&json!({ "code": code }))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e, code))?;
        let response = ensure_success(response, code).await?;
        let record: CurrencyRecord = response
            .json()
            .await
            .with_context(|| format!("Failed to parse created currency {code}"))?;
        Ok(record.into())
    }

    #[instrument(name = "BackendDelete", skip(self))]
    async fn delete(&self, code: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.currency_url(code))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e, code))?;
        ensure_success(response, code).await?;
        Ok(())
    }

    #[instrument(name = "BackendUpdateRate", skip(self))]
    async fn update_rate(&self, code: &str, rate_usd: Decimal) -> Result<WatchlistEntry> {
        let rate = rate_usd
            .to_f64()
            .ok_or_else(|| anyhow!("Rate {} for {} is not representable", rate_usd, code))?;
        let response = self
            .client
            .put(self.currency_url(code))
            .json(&json!({ "rate": rate }))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e, code))?;
        let response = ensure_success(response, code).await?;
        let record: CurrencyRecord = response
            .json()
            .await
            .with_context(|| format!("Failed to parse updated currency {code}"))?;
        Ok(record.into())
    }
}
