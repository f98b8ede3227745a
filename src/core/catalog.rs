//! Static universe of currencies that may be added to the watchlist

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

const DEFAULT_CURRENCIES: &[(&str, &str)] = &[
    ("USD", "Dólar Americano"),
    ("EUR", "Euro"),
    ("GBP", "Libra Esterlina"),
    ("CAD", "Dólar Canadense"),
    ("CHF", "Franco Suíço"),
    ("ARS", "Peso Argentino"),
    ("CLP", "Peso Chileno"),
    ("AUD", "Dólar Australiano"),
    ("JPY", "Iene Japonês"),
    ("CNY", "Yuan Chinês"),
    ("INR", "Rúpia Indiana"),
    ("MXN", "Peso Mexicano"),
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("BNB", "Binance Coin"),
    ("ADA", "Cardano"),
    ("SOL", "Solana"),
];

/// Immutable list of selectable currencies, in display order.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Catalog entries whose code is not in `tracked`.
    pub fn available<'a, I>(&self, tracked: I) -> Vec<CatalogEntry>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tracked: Vec<&str> = tracked.into_iter().collect();
        self.entries
            .iter()
            .filter(|e| !tracked.contains(&e.code.as_str()))
            .cloned()
            .collect()
    }

    /// A code may be sent to the rate provider if the catalog knows it or it
    /// looks like a plain ISO 4217 code.
    pub fn is_refreshable(&self, code: &str) -> bool {
        self.contains(code) || is_iso_like(code)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_CURRENCIES
                .iter()
                .map(|(code, name)| CatalogEntry::new(code, name))
                .collect(),
        )
    }
}

fn is_iso_like(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = Catalog::default();
        assert_eq!(catalog.entries().len(), 17);
        assert_eq!(catalog.get("BTC").unwrap().name, "Bitcoin");
        assert!(!catalog.contains("BRL"));
    }

    #[test]
    fn test_available_excludes_tracked() {
        let catalog = Catalog::default();
        let available = catalog.available(["EUR", "BTC"]);
        assert_eq!(available.len(), 15);
        assert!(available.iter().all(|e| e.code != "EUR" && e.code != "BTC"));
        // Order follows the catalog
        assert_eq!(available[0].code, "USD");
        assert_eq!(available[1].code, "GBP");
    }

    #[test]
    fn test_is_refreshable() {
        let catalog = Catalog::new(vec![CatalogEntry::new("DOGE", "Dogecoin")]);
        assert!(catalog.is_refreshable("DOGE"));
        assert!(catalog.is_refreshable("BRL"));
        assert!(!catalog.is_refreshable("brl"));
        assert!(!catalog.is_refreshable("SHIB"));
        assert!(!catalog.is_refreshable("B1L"));
        assert!(!catalog.is_refreshable(""));
    }
}
