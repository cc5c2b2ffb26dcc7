//! Turns a prepared `RedialConfig` into runtime components.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use redial_classifier::{default_phrases, ClassifierSettings, MatchMode, PhraseRule};
use redial_config::defaults::*;
use redial_config::RedialConfig;
use redial_core::{CallOutcome, CallTerminator, NumberPlan};
use redial_dispatcher::{
    adb_end_call, adb_templates, AppLauncher, CommandLauncher, CommandTemplate, CommandTerminator,
    DispatchMode, DispatchStep, DispatcherSettings, LogLauncher, LogTerminator,
};
use redial_engine::{EngineSettings, Guards, TerminationChain};
use redial_logging::LogOptions;
use redial_sources::default_packages;

pub fn number_plan(config: &RedialConfig) -> NumberPlan {
    let n = config.numbering.clone().unwrap_or_default();
    NumberPlan {
        country_code: n.country_code.unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
        trunk_prefix: n.trunk_prefix.unwrap_or_else(|| DEFAULT_TRUNK_PREFIX.to_string()),
        domestic_length: n.domestic_length.unwrap_or(DEFAULT_DOMESTIC_LENGTH),
    }
}

pub fn classifier_settings(config: &RedialConfig) -> Result<ClassifierSettings> {
    let c = config.classifier.clone().unwrap_or_default();
    let mode = match c.mode.as_deref().unwrap_or("exact") {
        "exact" => MatchMode::Exact,
        "fuzzy" => MatchMode::Fuzzy,
        other => return Err(anyhow!("unknown classifier mode '{other}'")),
    };

    let mut phrases = default_phrases();
    for extra in c.extra_phrases {
        let outcome: CallOutcome = extra.outcome.parse().map_err(|e: String| anyhow!(e))?;
        phrases.push(PhraseRule {
            text: extra.text,
            outcome,
            terminate: extra.terminate,
        });
    }

    Ok(ClassifierSettings {
        mode,
        phrases,
        ..Default::default()
    })
}

pub fn notification_packages(config: &RedialConfig) -> Vec<String> {
    config
        .classifier
        .as_ref()
        .and_then(|c| c.packages.clone())
        .unwrap_or_else(default_packages)
}

pub fn dispatcher_settings(config: &RedialConfig) -> DispatcherSettings {
    let d = config.dispatcher.clone().unwrap_or_default();
    let defaults = DispatcherSettings::default();
    DispatcherSettings {
        mode: match d.mode.as_deref() {
            Some("chat") => DispatchMode::Chat,
            _ => DispatchMode::Call,
        },
        target_package: d.target_package.unwrap_or(defaults.target_package),
        deep_link_base: d.deep_link_base.unwrap_or(defaults.deep_link_base),
        conversation_component: d
            .conversation_component
            .unwrap_or(defaults.conversation_component),
        identity_suffix: d.identity_suffix.unwrap_or(defaults.identity_suffix),
        anti_cache: d.anti_cache.unwrap_or(defaults.anti_cache),
    }
}

pub fn engine_settings(config: &RedialConfig) -> EngineSettings {
    let e = config.engine.clone().unwrap_or_default();
    EngineSettings {
        guards: Guards {
            cooldown: Duration::from_millis(e.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS)),
            staleness: Duration::from_millis(e.staleness_ms.unwrap_or(DEFAULT_STALENESS_MS)),
            suppress_after_pickup: e.suppress_after_pickup.unwrap_or(true),
        },
        idle_without_pickup_triggers: e.idle_without_pickup_triggers.unwrap_or(true),
    }
}

pub fn signal_buffer(config: &RedialConfig) -> usize {
    config
        .engine
        .as_ref()
        .and_then(|e| e.signal_buffer)
        .unwrap_or(DEFAULT_SIGNAL_BUFFER)
}

pub fn history_windows(config: &RedialConfig) -> Vec<Duration> {
    config
        .history
        .as_ref()
        .and_then(|h| h.windows_ms.clone())
        .unwrap_or_else(|| DEFAULT_HISTORY_WINDOWS_MS.to_vec())
        .into_iter()
        .map(Duration::from_millis)
        .collect()
}

pub fn history_timeout(config: &RedialConfig) -> Duration {
    let ms = config
        .history
        .as_ref()
        .and_then(|h| h.lookup_timeout_ms)
        .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_MS);
    Duration::from_millis(ms)
}

pub fn history_capacity(config: &RedialConfig) -> usize {
    config
        .history
        .as_ref()
        .and_then(|h| h.capacity)
        .unwrap_or(DEFAULT_HISTORY_CAPACITY)
}

fn parse_step(name: &str) -> Option<DispatchStep> {
    match name {
        "call_deep_link" => Some(DispatchStep::CallDeepLink),
        "chat_open" => Some(DispatchStep::ChatOpen),
        "conversation_open" => Some(DispatchStep::ConversationOpen),
        _ => None,
    }
}

fn launch_timeout(config: &RedialConfig) -> Duration {
    let ms = config
        .launcher
        .as_ref()
        .and_then(|l| l.timeout_ms)
        .unwrap_or(DEFAULT_LAUNCH_TIMEOUT_MS);
    Duration::from_millis(ms)
}

fn is_command(config: &RedialConfig) -> bool {
    config
        .launcher
        .as_ref()
        .and_then(|l| l.kind.as_deref())
        == Some("command")
}

pub fn launcher(config: &RedialConfig) -> Result<Arc<dyn AppLauncher>> {
    if !is_command(config) {
        return Ok(Arc::new(LogLauncher));
    }

    let mut templates: BTreeMap<DispatchStep, CommandTemplate> = adb_templates();
    if let Some(l) = &config.launcher {
        for (name, command) in &l.templates {
            let step = parse_step(name).ok_or_else(|| anyhow!("unknown dispatch step '{name}'"))?;
            templates.insert(
                step,
                CommandTemplate {
                    program: command.program.clone(),
                    args: command.args.clone(),
                    shell_quote: command.shell_quote,
                },
            );
        }
    }
    Ok(Arc::new(CommandLauncher::new(templates, launch_timeout(config))))
}

pub fn terminators(config: &RedialConfig) -> TerminationChain {
    if !is_command(config) {
        return TerminationChain::new(vec![Arc::new(LogTerminator)]);
    }

    let timeout = launch_timeout(config);
    let configured = config
        .launcher
        .as_ref()
        .map(|l| l.terminators.clone())
        .unwrap_or_default();

    let chain: Vec<Arc<dyn CallTerminator>> = if configured.is_empty() {
        vec![Arc::new(CommandTerminator::new("adb_keyevent", adb_end_call(), timeout))]
    } else {
        configured
            .into_iter()
            .map(|t| {
                let template = CommandTemplate {
                    program: t.program,
                    args: t.args,
                    shell_quote: false,
                };
                Arc::new(CommandTerminator::new(t.name, template, timeout)) as Arc<dyn CallTerminator>
            })
            .collect()
    };
    TerminationChain::new(chain)
}

pub fn log_options(config: &RedialConfig, level_override: Option<String>) -> LogOptions {
    let l = config.logging.clone().unwrap_or_default();
    LogOptions {
        level: level_override
            .or(l.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        dir: l.dir.map(Into::into),
        json: l.json.unwrap_or(false),
    }
}

pub fn redact_numbers(config: &RedialConfig) -> bool {
    config
        .logging
        .as_ref()
        .and_then(|l| l.redact_numbers)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use redial_config::{prepare, CommandConfig, LauncherConfig, PhraseConfig};

    fn prepared(yaml: &str) -> RedialConfig {
        prepare(serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    #[test]
    fn defaults_match_component_defaults() {
        let cfg = prepared("{}");
        assert_eq!(number_plan(&cfg), NumberPlan::default());
        assert_eq!(dispatcher_settings(&cfg), DispatcherSettings::default());
        let engine = engine_settings(&cfg);
        assert_eq!(engine.guards.cooldown, Duration::from_secs(3));
        assert_eq!(engine.guards.staleness, Duration::from_secs(30));
        assert_eq!(
            history_windows(&cfg),
            vec![Duration::from_secs(3), Duration::from_secs(20)]
        );
        assert_eq!(launcher(&cfg).unwrap().name(), "log");
    }

    #[test]
    fn chat_mode_and_plan_overrides() {
        let cfg = prepared(
            "dispatcher:\n  mode: chat\nnumbering:\n  countryCode: \"44\"\n  trunkPrefix: \"0\"\n",
        );
        assert_eq!(dispatcher_settings(&cfg).mode, DispatchMode::Chat);
        let plan = number_plan(&cfg);
        assert_eq!(plan.normalize("020 7946 0018"), "442079460018");
    }

    #[test]
    fn extra_phrases_are_classified() {
        let mut cfg = prepared("{}");
        if let Some(c) = cfg.classifier.as_mut() {
            c.extra_phrases.push(PhraseConfig {
                text: "Teilnehmer besetzt".into(),
                outcome: "busy".into(),
                terminate: true,
            });
        }
        let classifier = redial_classifier::OutcomeClassifier::new(classifier_settings(&cfg).unwrap());
        let verdict = classifier.classify_text("Teilnehmer besetzt").unwrap();
        assert_eq!(verdict.outcome, CallOutcome::Busy);
        assert!(verdict.policy.requires_termination);
    }

    #[test]
    fn command_launcher_with_template_override() {
        let mut cfg = prepared("{}");
        let mut l = LauncherConfig {
            kind: Some("command".into()),
            ..Default::default()
        };
        l.templates.insert(
            "chat_open".into(),
            CommandConfig {
                program: "echo".into(),
                args: vec!["{uri}".into()],
                ..Default::default()
            },
        );
        cfg.launcher = Some(l);
        assert_eq!(launcher(&cfg).unwrap().name(), "command");
        assert!(!terminators(&cfg).is_empty());
    }

    #[test]
    fn cli_level_overrides_config() {
        let cfg = prepared("logging:\n  level: warn\n");
        assert_eq!(log_options(&cfg, None).level, "warn");
        assert_eq!(log_options(&cfg, Some("debug".into())).level, "debug");
    }
}
