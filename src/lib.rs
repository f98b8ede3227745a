pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::ui::{self, StyleType, TableRenderer};
use crate::core::config::{API_KEY_ENV, AppConfig};
use crate::core::{DisplayBase, WatchlistEngine, WorkflowOutcome};
use crate::providers::{CurrencyFreaksProvider, WatchlistApi};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    List,
    Add(String),
    Remove(String),
    Refresh,
    Catalog { remote: bool },
    Shell { every: Option<Duration> },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn build_engine(config: &AppConfig, renderer: Arc<TableRenderer>, base: DisplayBase) -> Result<WatchlistEngine> {
    let timeout = config.request_timeout();
    let api_key = config.api_key().unwrap_or_else(|| {
        warn!("No rate provider API key configured, set {API_KEY_ENV} or rates.api_key");
        String::new()
    });

    let backend = WatchlistApi::new(&config.backend.base_url, timeout)?;
    let provider = CurrencyFreaksProvider::new(&config.rates.base_url, &api_key, timeout)?;

    Ok(WatchlistEngine::new(
        config.catalog(),
        Arc::new(backend),
        Arc::new(provider),
        renderer,
        base,
    ))
}

fn report(outcome: &WorkflowOutcome) {
    if *outcome == WorkflowOutcome::Offline {
        println!(
            "{}",
            ui::style_text("Remote service unavailable, kept local state", StyleType::Subtle)
        );
    }
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    base: Option<DisplayBase>,
) -> Result<()> {
    info!("fxwatch starting...");
    let config = load_config(config_path)?;
    let base = base.unwrap_or(config.display_base);

    if let AppCommand::Catalog { remote } = command {
        let entries = if remote {
            WatchlistApi::new(&config.backend.base_url, config.request_timeout())?
                .fetch_allowed()
                .await?
        } else {
            config.catalog().entries().to_vec()
        };
        println!("{}", ui::catalog_table(&entries));
        return Ok(());
    }

    let live = matches!(command, AppCommand::Shell { .. });
    let renderer = Arc::new(TableRenderer::new(live));
    let engine = Arc::new(build_engine(&config, renderer.clone(), base)?);

    engine.prime_anchor().await;
    report(&engine.load().await);

    let outcome = match command {
        AppCommand::List | AppCommand::Catalog { .. } => WorkflowOutcome::Completed,
        AppCommand::Add(code) => engine.add(&code.to_uppercase()).await,
        AppCommand::Remove(code) => engine.remove(&code.to_uppercase()).await,
        AppCommand::Refresh => {
            let pb = ui::new_spinner("Refreshing rates");
            let outcome = engine.refresh().await;
            pb.finish_and_clear();
            outcome
        }
        AppCommand::Shell { every } => {
            return cli::shell::run(engine, every).await;
        }
    };
    report(&outcome);
    renderer.print();
    Ok(())
}
