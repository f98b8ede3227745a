use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "fxwatch/1.0";

/// Builds the shared HTTP client. Without a timeout, requests wait for the
/// transport to resolve or fail on its own.
pub fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        debug!(?timeout, "Using request timeout");
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// Passes successful responses through; otherwise turns the status and the
/// body's `message`, if any, into an error.
pub async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<MessageBody>(&body) {
        Ok(MessageBody { message }) => Err(anyhow!("HTTP error: {} for {}: {}", status, what, message)),
        Err(_) => Err(anyhow!("HTTP error: {} for {}", status, what)),
    }
}

/// Parses a rate given either as plain or scientific notation.
pub fn parse_decimal(value: &str) -> Result<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| anyhow!("Invalid decimal '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("5.4321").unwrap(), Decimal::from_str("5.4321").unwrap());
        assert_eq!(parse_decimal(" 12 ").unwrap(), Decimal::from(12));
        assert_eq!(parse_decimal("1.5e-5").unwrap(), Decimal::from_str("0.000015").unwrap());
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("NaN").is_err());
    }
}
