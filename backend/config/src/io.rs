//! Config file location, reading, and atomic writing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::schema::RedialConfig;

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config directory: `REDIAL_CONFIG_DIR`, else `~/.redial`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REDIAL_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".redial"))
        .unwrap_or_else(|| PathBuf::from(".redial"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// A missing file is not an error; it yields the empty config.
pub async fn load_config(path: &Path) -> Result<RedialConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(RedialConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: RedialConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write `config` through a temp file and rename. The previous file is kept
/// as `config.yaml.bak`.
pub async fn write_config(config: &RedialConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        let bak = path.with_extension("yaml.bak");
        if let Err(e) = fs::copy(path, &bak).await {
            warn!(path = %bak.display(), error = %e, "Failed to back up config");
        }
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EngineConfig;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("redial-config-{}-{}", name, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[tokio::test]
    async fn missing_file_is_default() {
        let cfg = load_config(&scratch("missing")).await.unwrap();
        assert_eq!(cfg, RedialConfig::default());
    }

    #[tokio::test]
    async fn write_then_load() {
        let path = scratch("write");
        let mut cfg = RedialConfig::default();
        cfg.engine = Some(EngineConfig {
            cooldown_ms: Some(4_000),
            ..Default::default()
        });
        write_config(&cfg, &path).await.unwrap();
        write_config(&cfg, &path).await.unwrap();

        assert_eq!(load_config(&path).await.unwrap(), cfg);
        assert!(fs::try_exists(path.with_extension("yaml.bak")).await.unwrap());
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn malformed_yaml_is_error() {
        let path = scratch("malformed");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "engine: [unclosed").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
