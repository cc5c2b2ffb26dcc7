//! Redial runtime configuration schema.
//!
//! Every field is optional on disk; `apply_all_defaults` fills in whatever
//! the file leaves out. Keys are camelCase in YAML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedialConfig {
    /// Guards and timing of the trigger engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,

    /// Call history fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,

    /// Numbering plan used for normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbering: Option<NumberingConfig>,

    /// Notification text classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,

    /// Hand-off target and chain mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatcher: Option<DispatcherConfig>,

    /// How launches and hang-ups are carried out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<LauncherConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staleness_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_after_pickup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_without_pickup_triggers: Option<bool>,
    /// Capacity of the signal queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_buffer: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Lookup windows tried in order, shortest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_ms: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_timeout_ms: Option<u64>,
    /// Records kept by the in-memory call log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domestic_length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// "exact" or "fuzzy"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Packages whose notifications are considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    /// Phrases added to the built-in exact-match table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_phrases: Vec<PhraseConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseConfig {
    pub text: String,
    /// Outcome name, e.g. "busy" or "forwarded"
    pub outcome: String,
    #[serde(default)]
    pub terminate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherConfig {
    /// "call" or "chat"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_link_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    /// "log" (dry run) or "command"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Per-step command templates keyed by step name; missing steps use adb
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, CommandConfig>,
    /// Hang-up commands tried in order (command kind only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminators: Vec<TerminatorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Shell-quote substituted values (for `adb shell` style commands)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shell_quote: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatorConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the daily NDJSON log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
    /// Mask phone numbers in log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_numbers: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
engine:
  cooldownMs: 5000
  suppressAfterPickup: false
history:
  windowsMs: [2000, 15000]
dispatcher:
  mode: chat
launcher:
  kind: command
  templates:
    chat_open:
      program: adb
      args: ["shell", "am", "start", "-d", "{uri}"]
"#;
        let cfg: RedialConfig = serde_yaml::from_str(yaml).unwrap();
        let engine = cfg.engine.unwrap();
        assert_eq!(engine.cooldown_ms, Some(5000));
        assert_eq!(engine.suppress_after_pickup, Some(false));
        assert_eq!(cfg.history.unwrap().windows_ms, Some(vec![2000, 15000]));
        assert_eq!(cfg.dispatcher.unwrap().mode.as_deref(), Some("chat"));
        let launcher = cfg.launcher.unwrap();
        assert_eq!(launcher.templates["chat_open"].args[4], "{uri}");
    }

    #[test]
    fn empty_document_is_default() {
        let cfg: RedialConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, RedialConfig::default());
    }
}
