//! `redial-config` — runtime configuration for the Redial engine.
//!
//! Provides:
//! - Typed, all-optional config schema (YAML, camelCase keys)
//! - File location, loading, and atomic writing
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{
    ClassifierConfig, CommandConfig, DispatcherConfig, EngineConfig, HistoryConfig, LauncherConfig,
    LoggingConfig, NumberingConfig, PhraseConfig, RedialConfig, TerminatorConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport, STEP_NAMES};

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Load, substitute env vars, apply defaults, and validate a config file.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<RedialConfig> {
    let raw = load_config(path).await?;
    prepare(raw)
}

/// The in-memory half of `load_and_prepare`.
pub fn prepare(raw: RedialConfig) -> Result<RedialConfig> {
    let value = serde_json::to_value(&raw).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: RedialConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "{} config error(s): {}",
            report.errors.len(),
            report
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        );
    }

    Ok(config)
}
