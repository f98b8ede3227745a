use crate::core::catalog::{Catalog, CatalogEntry};
use crate::core::rates::DisplayBase;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "FXWATCH_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_url: "https://api.currencyfreaks.com".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub display_base: DisplayBase,
    /// Applies to every outbound request; unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Replaces the built-in catalog when present.
    #[serde(default)]
    pub catalog: Option<Vec<CatalogEntry>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fxwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.rates.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn catalog(&self) -> Catalog {
        match &self.catalog {
            Some(entries) if !entries.is_empty() => Catalog::new(entries.clone()),
            _ => Catalog::default(),
        }
    }
}
