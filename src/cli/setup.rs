use crate::core::config::{API_KEY_ENV, AppConfig};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example configuration to the per-user config location and
/// returns where it went.
pub fn setup(force: bool) -> Result<PathBuf> {
    let path = AppConfig::default_config_path()?;
    write_example_config(&path, force)?;
    Ok(path)
}

/// Writes the example configuration to `path`. An existing file is only
/// replaced with `force`.
pub fn write_example_config(path: &Path, force: bool) -> Result<()> {
    match (path.exists(), force) {
        (true, false) => bail!(
            "Configuration file already exists at {}, use --force to overwrite",
            path.display()
        ),
        (true, true) => warn!(path = %path.display(), "Overwriting existing configuration"),
        (false, _) => {}
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    info!(path = %path.display(), "Wrote example configuration");
    if std::env::var_os(API_KEY_ENV).is_none() {
        println!("Set rates.api_key in {} or export {API_KEY_ENV}", path.display());
    }
    Ok(())
}
