mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./mediadex.toml",
        "./config.toml",
        "~/.config/mediadex/config.toml",
        "/etc/mediadex/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            config.catalog.api_key = Some(key.trim().to_string());
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.catalog.min_interval_ms == 0 {
        anyhow::bail!("catalog.min_interval_ms cannot be 0");
    }
    if config.catalog.request_timeout_secs == 0 {
        anyhow::bail!("catalog.request_timeout_secs cannot be 0");
    }
    if config.watch.stability_threshold_ms == 0 {
        anyhow::bail!("watch.stability_threshold_ms cannot be 0");
    }
    if config.watch.poll_interval_ms == 0 {
        anyhow::bail!("watch.poll_interval_ms cannot be 0");
    }
    if config.watch.debounce_ms == 0 {
        anyhow::bail!("watch.debounce_ms cannot be 0");
    }
    if config.watch.max_depth == 0 {
        anyhow::bail!("watch.max_depth cannot be 0");
    }

    for folder in &config.folders {
        if !folder.path.is_absolute() {
            anyhow::bail!("Folder path must be absolute: {:?}", folder.path);
        }
        if !folder.path.exists() {
            tracing::warn!("Watched folder does not exist: {:?}", folder.path);
        }
    }

    Ok(())
}
