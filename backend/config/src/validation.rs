//! Config validation: checks with field paths and readable messages.

use thiserror::Error;

use redial_core::CallOutcome;

use crate::schema::RedialConfig;

/// Step names accepted as launcher template keys.
pub const STEP_NAMES: [&str; 3] = ["call_deep_link", "chat_open", "conversation_open"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Every error and warning found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return all errors and warnings.
pub fn validate(config: &RedialConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_engine(config, &mut report);
    validate_history(config, &mut report);
    validate_numbering(config, &mut report);
    validate_classifier(config, &mut report);
    validate_dispatcher(config, &mut report);
    validate_launcher(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_engine(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(engine) = &config.engine else { return };
    if engine.cooldown_ms == Some(0) {
        report.error("engine.cooldownMs", "cooldownMs must be > 0");
    }
    if let (Some(cooldown), Some(staleness)) = (engine.cooldown_ms, engine.staleness_ms) {
        if staleness <= cooldown {
            report.error(
                "engine.stalenessMs",
                format!("stalenessMs ({staleness}) must be greater than cooldownMs ({cooldown})"),
            );
        }
    }
    if engine.signal_buffer == Some(0) {
        report.error("engine.signalBuffer", "signalBuffer must be >= 1");
    }
    if engine.suppress_after_pickup == Some(false) {
        report.warn(
            "engine.suppressAfterPickup",
            "Answered calls may be redirected when a failure notification follows pickup",
        );
    }
}

fn validate_history(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(history) = &config.history else { return };
    if let Some(windows) = &history.windows_ms {
        if windows.is_empty() {
            report.warn("history.windowsMs", "No history windows; only live capture can supply a number");
        }
        if windows.iter().any(|w| *w == 0) {
            report.error("history.windowsMs", "Windows must be > 0");
        }
        if windows.windows(2).any(|pair| pair[0] >= pair[1]) {
            report.error("history.windowsMs", "Windows must be strictly increasing");
        }
    }
    if history.lookup_timeout_ms == Some(0) {
        report.error("history.lookupTimeoutMs", "lookupTimeoutMs must be > 0");
    }
    if history.capacity == Some(0) {
        report.error("history.capacity", "capacity must be >= 1");
    }
}

fn validate_numbering(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(numbering) = &config.numbering else { return };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if let Some(cc) = &numbering.country_code {
        if cc.is_empty() || !all_digits(cc) {
            report.error("numbering.countryCode", format!("Country code '{cc}' must be 1+ digits"));
        }
    }
    if let Some(trunk) = &numbering.trunk_prefix {
        if !all_digits(trunk) {
            report.error("numbering.trunkPrefix", format!("Trunk prefix '{trunk}' must be digits"));
        }
    }
    if let Some(len) = numbering.domestic_length {
        if !(4..=15).contains(&len) {
            report.error("numbering.domesticLength", "domesticLength must be between 4 and 15");
        }
    }
}

fn validate_classifier(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(classifier) = &config.classifier else { return };
    if let Some(mode) = &classifier.mode {
        if !matches!(mode.as_str(), "exact" | "fuzzy") {
            report.error(
                "classifier.mode",
                format!("Unknown match mode '{mode}'. Use 'exact' or 'fuzzy'"),
            );
        }
    }
    if let Some(packages) = &classifier.packages {
        if packages.is_empty() {
            report.warn("classifier.packages", "Empty package list; no notification will be accepted");
        }
    }
    for (i, phrase) in classifier.extra_phrases.iter().enumerate() {
        let path = format!("classifier.extraPhrases[{i}]");
        if phrase.text.is_empty() {
            report.error(format!("{path}.text"), "Phrase text cannot be empty");
        }
        match phrase.outcome.parse::<CallOutcome>() {
            Ok(outcome) if !outcome.is_failure() => {
                report.warn(format!("{path}.outcome"), format!("'{outcome}' never triggers a redirect"));
            }
            Ok(_) => {}
            Err(e) => report.error(format!("{path}.outcome"), e),
        }
    }
}

fn validate_dispatcher(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(d) = &config.dispatcher else { return };
    if let Some(mode) = &d.mode {
        if !matches!(mode.as_str(), "call" | "chat") {
            report.error(
                "dispatcher.mode",
                format!("Unknown dispatch mode '{mode}'. Use 'call' or 'chat'"),
            );
        }
    }
    if d.target_package.as_deref().map(str::is_empty).unwrap_or(false) {
        report.error("dispatcher.targetPackage", "Target package cannot be empty");
    }
    if let Some(base) = &d.deep_link_base {
        if !base.starts_with("https://") && !base.starts_with("http://") {
            report.error("dispatcher.deepLinkBase", format!("'{base}' is not an http(s) link base"));
        }
    }
    if d.anti_cache == Some(false) {
        report.warn(
            "dispatcher.antiCache",
            "Repeated hand-offs to the same number may be ignored by the target application",
        );
    }
}

fn validate_launcher(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(launcher) = &config.launcher else { return };
    let kind = launcher.kind.as_deref().unwrap_or("log");
    if !matches!(kind, "log" | "command") {
        report.error(
            "launcher.kind",
            format!("Unknown launcher kind '{kind}'. Use 'log' or 'command'"),
        );
    }
    if launcher.timeout_ms == Some(0) {
        report.error("launcher.timeoutMs", "timeoutMs must be > 0");
    }
    for (step, command) in &launcher.templates {
        let path = format!("launcher.templates.{step}");
        if !STEP_NAMES.contains(&step.as_str()) {
            report.error(&path, format!("Unknown step '{step}'. Use one of {STEP_NAMES:?}"));
        }
        if command.program.trim().is_empty() {
            report.error(format!("{path}.program"), "Program cannot be empty");
        }
    }
    for (i, t) in launcher.terminators.iter().enumerate() {
        if t.program.trim().is_empty() {
            report.error(format!("launcher.terminators[{i}].program"), "Program cannot be empty");
        }
    }
    if kind == "log" && (!launcher.templates.is_empty() || !launcher.terminators.is_empty()) {
        report.warn("launcher.kind", "Templates and terminators are ignored by the log launcher");
    }
}

fn validate_logging(config: &RedialConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error("logging.level", format!("Unknown log level '{level}'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{CommandConfig, EngineConfig, HistoryConfig, LauncherConfig, PhraseConfig};

    fn defaults() -> RedialConfig {
        apply_all_defaults(RedialConfig::default())
    }

    #[test]
    fn default_config_is_valid() {
        let report = validate(&defaults());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn staleness_must_exceed_cooldown() {
        let mut cfg = defaults();
        cfg.engine = Some(EngineConfig {
            cooldown_ms: Some(5_000),
            staleness_ms: Some(5_000),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "engine.stalenessMs");
    }

    #[test]
    fn windows_must_increase() {
        let mut cfg = defaults();
        cfg.history = Some(HistoryConfig {
            windows_ms: Some(vec![20_000, 3_000]),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "history.windowsMs"));
    }

    #[test]
    fn bad_phrase_outcome_is_error() {
        let mut cfg = defaults();
        if let Some(classifier) = cfg.classifier.as_mut() {
            classifier.extra_phrases.push(PhraseConfig {
                text: "Abonent zanyat".into(),
                outcome: "engaged".into(),
                terminate: true,
            });
        }
        let report = validate(&cfg);
        assert!(report.errors[0].path.contains("extraPhrases[0].outcome"));
    }

    #[test]
    fn unknown_template_step_is_error() {
        let mut cfg = defaults();
        let mut launcher = LauncherConfig {
            kind: Some("command".into()),
            ..Default::default()
        };
        launcher.templates.insert(
            "video_call".into(),
            CommandConfig {
                program: "adb".into(),
                args: vec![],
                ..Default::default()
            },
        );
        cfg.launcher = Some(launcher);
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "launcher.templates.video_call"));
    }
}
