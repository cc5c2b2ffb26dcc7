//! Config defaults: fills in every value the file left out.

use crate::schema::{
    ClassifierConfig, DispatcherConfig, EngineConfig, HistoryConfig, LauncherConfig,
    LoggingConfig, NumberingConfig, RedialConfig,
};

pub const DEFAULT_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_STALENESS_MS: u64 = 30_000;
pub const DEFAULT_SIGNAL_BUFFER: usize = 256;

/// Short window first, then the long one.
pub const DEFAULT_HISTORY_WINDOWS_MS: [u64; 2] = [3_000, 20_000];
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 1_500;
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

pub const DEFAULT_COUNTRY_CODE: &str = "7";
pub const DEFAULT_TRUNK_PREFIX: &str = "8";
pub const DEFAULT_DOMESTIC_LENGTH: usize = 10;

pub const DEFAULT_TARGET_PACKAGE: &str = "com.whatsapp";
pub const DEFAULT_DEEP_LINK_BASE: &str = "https://wa.me/";
pub const DEFAULT_CONVERSATION_COMPONENT: &str = "com.whatsapp.Conversation";
pub const DEFAULT_IDENTITY_SUFFIX: &str = "@s.whatsapp.net";

pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: RedialConfig) -> RedialConfig {
    let config = apply_engine_defaults(config);
    let config = apply_history_defaults(config);
    let config = apply_numbering_defaults(config);
    let config = apply_classifier_defaults(config);
    let config = apply_dispatcher_defaults(config);
    let config = apply_launcher_defaults(config);
    apply_logging_defaults(config)
}

fn apply_engine_defaults(mut config: RedialConfig) -> RedialConfig {
    let engine = config.engine.get_or_insert_with(EngineConfig::default);
    engine.cooldown_ms.get_or_insert(DEFAULT_COOLDOWN_MS);
    engine.staleness_ms.get_or_insert(DEFAULT_STALENESS_MS);
    engine.suppress_after_pickup.get_or_insert(true);
    engine.idle_without_pickup_triggers.get_or_insert(true);
    engine.signal_buffer.get_or_insert(DEFAULT_SIGNAL_BUFFER);
    config
}

fn apply_history_defaults(mut config: RedialConfig) -> RedialConfig {
    let history = config.history.get_or_insert_with(HistoryConfig::default);
    history
        .windows_ms
        .get_or_insert_with(|| DEFAULT_HISTORY_WINDOWS_MS.to_vec());
    history.lookup_timeout_ms.get_or_insert(DEFAULT_LOOKUP_TIMEOUT_MS);
    history.capacity.get_or_insert(DEFAULT_HISTORY_CAPACITY);
    config
}

fn apply_numbering_defaults(mut config: RedialConfig) -> RedialConfig {
    let numbering = config.numbering.get_or_insert_with(NumberingConfig::default);
    numbering
        .country_code
        .get_or_insert_with(|| DEFAULT_COUNTRY_CODE.to_string());
    numbering
        .trunk_prefix
        .get_or_insert_with(|| DEFAULT_TRUNK_PREFIX.to_string());
    numbering.domestic_length.get_or_insert(DEFAULT_DOMESTIC_LENGTH);
    config
}

/// Exact matching unless fuzzy is asked for; packages stay unset so the
/// built-in allow-list applies.
fn apply_classifier_defaults(mut config: RedialConfig) -> RedialConfig {
    let classifier = config.classifier.get_or_insert_with(ClassifierConfig::default);
    classifier.mode.get_or_insert_with(|| "exact".to_string());
    config
}

fn apply_dispatcher_defaults(mut config: RedialConfig) -> RedialConfig {
    let d = config.dispatcher.get_or_insert_with(DispatcherConfig::default);
    d.mode.get_or_insert_with(|| "call".to_string());
    d.target_package
        .get_or_insert_with(|| DEFAULT_TARGET_PACKAGE.to_string());
    d.deep_link_base
        .get_or_insert_with(|| DEFAULT_DEEP_LINK_BASE.to_string());
    d.conversation_component
        .get_or_insert_with(|| DEFAULT_CONVERSATION_COMPONENT.to_string());
    d.identity_suffix
        .get_or_insert_with(|| DEFAULT_IDENTITY_SUFFIX.to_string());
    d.anti_cache.get_or_insert(true);
    config
}

fn apply_launcher_defaults(mut config: RedialConfig) -> RedialConfig {
    let launcher = config.launcher.get_or_insert_with(LauncherConfig::default);
    launcher.kind.get_or_insert_with(|| "log".to_string());
    launcher.timeout_ms.get_or_insert(DEFAULT_LAUNCH_TIMEOUT_MS);
    config
}

fn apply_logging_defaults(mut config: RedialConfig) -> RedialConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    logging.redact_numbers.get_or_insert(true);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_engine_timing() {
        let cfg = apply_all_defaults(RedialConfig::default());
        let engine = cfg.engine.unwrap();
        assert_eq!(engine.cooldown_ms, Some(DEFAULT_COOLDOWN_MS));
        assert_eq!(engine.staleness_ms, Some(DEFAULT_STALENESS_MS));
        assert_eq!(engine.suppress_after_pickup, Some(true));
    }

    #[test]
    fn fills_history_windows() {
        let cfg = apply_all_defaults(RedialConfig::default());
        assert_eq!(cfg.history.unwrap().windows_ms, Some(vec![3_000, 20_000]));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = RedialConfig::default();
        cfg.engine = Some(EngineConfig {
            cooldown_ms: Some(1_000),
            ..Default::default()
        });
        cfg.dispatcher = Some(DispatcherConfig {
            mode: Some("chat".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.engine.unwrap().cooldown_ms, Some(1_000));
        let d = cfg.dispatcher.unwrap();
        assert_eq!(d.mode.as_deref(), Some("chat"));
        assert_eq!(d.target_package.as_deref(), Some(DEFAULT_TARGET_PACKAGE));
    }

    #[test]
    fn defaults_are_stable() {
        let once = apply_all_defaults(RedialConfig::default());
        let twice = apply_all_defaults(once.clone());
        assert_eq!(once, twice);
    }
}
