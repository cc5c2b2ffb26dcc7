//! Scripted replay: drives the real sources and engine from an NDJSON file.
//!
//! Each non-blank line that does not start with `#` is one record holding
//! exactly one of `telephony`, `notification` or `history`, plus an optional
//! `delayMs` waited before it is delivered:
//!
//! ```text
//! {"history": {"number": "89161234567", "agoMs": 500}}
//! {"delayMs": 0, "telephony": {"type": "outgoing_number_observed", "number": "89161234567"}}
//! {"delayMs": 1200, "notification": {"package": "com.android.phone", "text": "Line busy."}}
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use redial_classifier::OutcomeClassifier;
use redial_config::RedialConfig;
use redial_core::{EngineEvent, SignalBus};
use redial_dispatcher::ActionDispatcher;
use redial_engine::{spawn_source, NumberResolver, TriggerEngine};
use redial_logging::EventLogger;
use redial_sources::{
    CallDirection, CallHistoryLookup, InMemoryCallLog, LiveCapture, Notification,
    OutcomeNotification, TelephonyEvent,
};

use crate::wiring;

const FEED_BUFFER: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ScriptLine {
    #[serde(default)]
    delay_ms: u64,
    #[serde(default)]
    telephony: Option<TelephonyEvent>,
    #[serde(default)]
    notification: Option<Notification>,
    #[serde(default)]
    history: Option<HistoryEntry>,
}

/// A call log record written before later steps run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub number: String,
    /// How long before now the call was placed.
    #[serde(default)]
    pub ago_ms: u64,
    #[serde(default = "outgoing")]
    pub direction: CallDirection,
}

fn outgoing() -> CallDirection {
    CallDirection::Outgoing
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptInput {
    Telephony(TelephonyEvent),
    Notification(Notification),
    History(HistoryEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub delay: Duration,
    pub input: ScriptInput,
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record: ScriptLine =
            serde_json::from_str(trimmed).with_context(|| format!("line {line_no}: invalid record"))?;
        let mut inputs = Vec::with_capacity(1);
        inputs.extend(record.telephony.map(ScriptInput::Telephony));
        inputs.extend(record.notification.map(ScriptInput::Notification));
        inputs.extend(record.history.map(ScriptInput::History));
        if inputs.len() != 1 {
            bail!(
                "line {line_no}: expected exactly one of telephony, notification or history, found {}",
                inputs.len()
            );
        }

        steps.push(ScriptStep {
            delay: Duration::from_millis(record.delay_ms),
            input: inputs.remove(0),
        });
    }
    Ok(steps)
}

/// Replay `steps` through a freshly wired engine and return every event it
/// published, in order.
pub async fn run_replay(config: &RedialConfig, steps: Vec<ScriptStep>) -> Result<Vec<EngineEvent>> {
    let plan = wiring::number_plan(config);
    let classifier = Arc::new(OutcomeClassifier::new(wiring::classifier_settings(config)?));

    let mut bus = SignalBus::with_buffer_size(wiring::signal_buffer(config));
    let signal_rx = bus
        .take_signal_rx()
        .ok_or_else(|| anyhow!("signal receiver already taken"))?;

    let (telephony_tx, telephony_rx) = mpsc::channel(FEED_BUFFER);
    let (notification_tx, notification_rx) = mpsc::channel(FEED_BUFFER);
    let sources = vec![
        spawn_source(
            Arc::new(LiveCapture::new(plan.clone(), telephony_rx)),
            bus.sink("live_capture"),
        ),
        spawn_source(
            Arc::new(OutcomeNotification::new(
                wiring::notification_packages(config),
                classifier.clone(),
                notification_rx,
            )),
            bus.sink("notification"),
        ),
    ];
    // Only the sinks held by the sources keep the signal channel open.
    drop(bus);

    let call_log = Arc::new(InMemoryCallLog::new(wiring::history_capacity(config)));
    let lookup = CallHistoryLookup::new(call_log.clone(), plan, wiring::history_timeout(config));
    let resolver = NumberResolver::new(Some(lookup), wiring::history_windows(config));
    let dispatcher = Arc::new(ActionDispatcher::new(
        wiring::dispatcher_settings(config),
        wiring::launcher(config)?,
    ));

    let engine = TriggerEngine::new(
        wiring::engine_settings(config),
        classifier,
        resolver,
        wiring::terminators(config),
        dispatcher,
    );
    let logger = tokio::spawn(EventLogger::new(wiring::redact_numbers(config)).run(engine.subscribe()));
    let collector = tokio::spawn(collect(engine.subscribe()));
    let engine = engine.spawn(signal_rx);

    info!(steps = steps.len(), "Replay started");
    for step in steps {
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        match step.input {
            ScriptInput::Telephony(event) => {
                debug!(?event, "Replaying telephony event");
                telephony_tx.send(event).await.context("live capture stopped early")?;
            }
            ScriptInput::Notification(notification) => {
                debug!(package = %notification.package, "Replaying notification");
                notification_tx
                    .send(notification)
                    .await
                    .context("notification source stopped early")?;
            }
            ScriptInput::History(entry) => {
                let placed_at = Utc::now() - chrono::Duration::milliseconds(entry.ago_ms as i64);
                call_log.record(entry.direction, entry.number, placed_at).await;
            }
        }
    }

    drop(telephony_tx);
    drop(notification_tx);
    for source in sources {
        source.await.context("signal source task panicked")?;
    }
    engine.await.context("engine task panicked")?;
    logger.await.context("event logger task panicked")?;
    let events = collector.await.context("event collector task panicked")?;

    info!(events = events.len(), "Replay finished");
    Ok(events)
}

async fn collect(mut rx: broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => events.push(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Replay fell behind, events skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use redial_config::prepare;
    use redial_core::{EngineEventKind, LineState};

    fn config() -> RedialConfig {
        prepare(RedialConfig::default()).unwrap()
    }

    fn kinds(events: &[EngineEvent]) -> Vec<EngineEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn parses_records_and_skips_comments() {
        let script = r#"
# busy callee
{"history": {"number": "89161234567", "agoMs": 500}}
{"telephony": {"type": "call_state_changed", "to": "OFFHOOK"}}

{"delayMs": 250, "notification": {"package": "com.android.phone", "text": "Line busy."}}
"#;
        let steps = parse_script(script).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0].input,
            ScriptInput::History(HistoryEntry {
                number: "89161234567".into(),
                ago_ms: 500,
                direction: CallDirection::Outgoing,
            })
        );
        assert_eq!(
            steps[1].input,
            ScriptInput::Telephony(TelephonyEvent::CallStateChanged {
                from: None,
                to: LineState::Offhook,
            })
        );
        assert_eq!(steps[2].delay, Duration::from_millis(250));
    }

    #[test]
    fn rejects_record_with_two_inputs() {
        let script = concat!(
            "{\"history\": {\"number\": \"1\"}}\n",
            "{\"history\": {\"number\": \"1\"}, \"notification\": {\"package\": \"p\", \"text\": \"t\"}}\n",
        );
        let err = parse_script(script).unwrap_err().to_string();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn reports_line_of_bad_json() {
        let err = parse_script("\n{\"telephony\": {\"type\": \"teleport\"}}").unwrap_err();
        assert!(err.to_string().starts_with("line 2"));
    }

    #[tokio::test]
    async fn busy_after_capture_dispatches_deep_link() {
        let script = r#"
{"telephony": {"type": "outgoing_number_observed", "number": "8 (916) 123-45-67"}}
{"delayMs": 20, "telephony": {"type": "disconnect_reason", "code": "BUSY"}}
"#;
        let events = run_replay(&config(), parse_script(script).unwrap()).await.unwrap();
        let kinds = kinds(&events);

        assert_eq!(kinds[0], EngineEventKind::Captured);
        assert!(kinds.contains(&EngineEventKind::Triggered));
        assert!(kinds.contains(&EngineEventKind::Terminated));
        let dispatched = events
            .iter()
            .find(|e| e.kind == EngineEventKind::Dispatched)
            .expect("dispatched event");
        assert_eq!(dispatched.detail["number"], "79161234567");
        assert_eq!(dispatched.detail["step"], "call_deep_link");
    }

    #[tokio::test]
    async fn notification_without_capture_resolves_from_history() {
        let script = r#"
{"history": {"number": "89161234567", "agoMs": 400}}
{"notification": {"package": "com.android.phone", "text": "Line busy."}}
"#;
        let events = run_replay(&config(), parse_script(script).unwrap()).await.unwrap();
        let dispatched = events
            .iter()
            .find(|e| e.kind == EngineEventKind::Dispatched)
            .expect("dispatched event");
        assert_eq!(dispatched.detail["number"], "79161234567");
    }

    #[tokio::test]
    async fn notification_from_unlisted_package_is_ignored() {
        let script = r#"
{"telephony": {"type": "outgoing_number_observed", "number": "89161234567"}}
{"notification": {"package": "com.example.chat", "text": "Line busy."}}
"#;
        let events = run_replay(&config(), parse_script(script).unwrap()).await.unwrap();
        assert_eq!(kinds(&events), vec![EngineEventKind::Captured]);
    }
}
