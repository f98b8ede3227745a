use super::util::{ensure_success, http_client, parse_decimal};
use crate::core::rates::RateProvider;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Latest-rates client for the CurrencyFreaks API. All rates are USD based.
pub struct CurrencyFreaksProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl CurrencyFreaksProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(CurrencyFreaksProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: HashMap<String, Value>,
}

fn rate_value(value: &Value) -> Result<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        other => Err(anyhow!("Unexpected rate value: {}", other)),
    }
}

#[async_trait]
impl RateProvider for CurrencyFreaksProvider {
    #[instrument(
        name = "CurrencyFreaksFetch",
        skip(self, symbols),
        fields(symbols = %symbols.join(","))
    )]
    async fn fetch_rates(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols.join(",");
        let url = Url::parse_with_params(
            &format!("{}/latest", self.base_url),
            &[("apikey", self.api_key.as_str()), ("symbols", joined.as_str())],
        )
        .context("Invalid rates base URL")?;
        debug!("Requesting rates for {}", joined);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbols: {}", e, joined))?;

        let response = ensure_success(response, &joined).await?;
        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response for {joined}"))?;

        let mut rates = HashMap::with_capacity(data.rates.len());
        for (symbol, value) in data.rates {
            match rate_value(&value) {
                Ok(rate) if !rate.is_sign_negative() => {
                    rates.insert(symbol, rate);
                }
                Ok(rate) => warn!(%symbol, %rate, "Dropping negative rate"),
                Err(e) => warn!(%symbol, error = %e, "Dropping unparseable rate"),
            }
        }
        debug!(returned = rates.len(), "Received rates");
        Ok(rates)
    }
}
