use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use redial_classifier::OutcomeClassifier;
use redial_core::{
    DialedNumber, EngineEvent, EngineEventKind, LineState, RawSignal, RedialError, SignalEvent,
    SignalSink, SignalSource, Verdict,
};
use redial_dispatcher::{ActionDispatcher, DispatchReport};

use crate::resolver::{NumberResolver, Resolution};
use crate::state::{CallState, Capture, Decision, Guards, Hangup};
use crate::termination::{TerminationChain, TerminationOutcome};

const EVENT_BUFFER: usize = 256;
const REPORT_BUFFER: usize = 16;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub guards: Guards,
    /// Treat an idle line after an unanswered outgoing call as a failure.
    pub idle_without_pickup_triggers: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            guards: Guards::default(),
            idle_without_pickup_triggers: true,
        }
    }
}

/// Results handed back to the loop by worker tasks.
enum WorkerReport {
    Resolved {
        id: u64,
        resolution: Option<(DialedNumber, Resolution)>,
        termination: Option<TerminationOutcome>,
    },
    Dispatched {
        id: u64,
        report: DispatchReport,
    },
}

/// The decision loop. Owns `CallState`; everything else talks to it through
/// the signal channel.
pub struct TriggerEngine {
    settings: EngineSettings,
    classifier: Arc<OutcomeClassifier>,
    resolver: NumberResolver,
    terminators: TerminationChain,
    dispatcher: Arc<ActionDispatcher>,
    events: broadcast::Sender<EngineEvent>,
}

impl TriggerEngine {
    pub fn new(
        settings: EngineSettings,
        classifier: Arc<OutcomeClassifier>,
        resolver: NumberResolver,
        terminators: TerminationChain,
        dispatcher: Arc<ActionDispatcher>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            settings,
            classifier,
            resolver,
            terminators,
            dispatcher,
            events,
        }
    }

    /// Subscribe to engine events. Subscribe before `spawn` to see everything.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn spawn(self, signals: mpsc::Receiver<SignalEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(signals))
    }

    /// Run until the signal channel closes and in-flight work has finished.
    pub async fn run(self, mut signals: mpsc::Receiver<SignalEvent>) {
        let (report_tx, mut report_rx) = mpsc::channel(REPORT_BUFFER);
        let mut state = CallState::new(self.settings.guards.clone());
        let mut in_flight = 0usize;
        let mut open = true;

        info!(
            cooldown_ms = self.settings.guards.cooldown.as_millis() as u64,
            staleness_ms = self.settings.guards.staleness.as_millis() as u64,
            "Trigger engine started"
        );

        loop {
            if !open && in_flight == 0 {
                break;
            }
            tokio::select! {
                signal = signals.recv(), if open => {
                    match signal {
                        Some(event) => {
                            in_flight += self.on_signal(&mut state, event, &report_tx);
                        }
                        None => {
                            info!(in_flight, "Signal channel closed, draining in-flight work");
                            open = false;
                        }
                    }
                }
                Some(report) = report_rx.recv() => {
                    in_flight -= 1;
                    in_flight += self.on_report(&mut state, report, &report_tx);
                }
            }
        }

        info!("Trigger engine stopped");
    }

    /// Apply one signal. Returns the number of workers started.
    fn on_signal(
        &self,
        state: &mut CallState,
        event: SignalEvent,
        report_tx: &mpsc::Sender<WorkerReport>,
    ) -> usize {
        let SignalEvent { signal, at, origin } = event;
        debug!(origin = %origin, signal = signal.kind(), "Signal received");

        match signal {
            RawSignal::Dialed { number, via } => {
                match state.on_dialed(number.clone(), via, at) {
                    Capture::Opened { id, superseded } => {
                        info!(attempt = id, via = ?via, "Number captured");
                        self.publish(
                            id,
                            EngineEventKind::Captured,
                            json!({ "number": number, "via": via, "superseded": superseded }),
                        );
                    }
                    Capture::Coalesced { id } => {
                        debug!(attempt = id, "Repeated capture coalesced");
                        self.publish(
                            id,
                            EngineEventKind::EchoIgnored,
                            json!({ "number": number, "via": via, "reason": "coalesced" }),
                        );
                    }
                    Capture::IgnoredEcho { id, reason } => {
                        info!(attempt = id, reason = ?reason, "Capture of the redirected number ignored");
                        self.publish(
                            id,
                            EngineEventKind::EchoIgnored,
                            json!({ "number": number, "via": via, "reason": reason }),
                        );
                    }
                }
                0
            }
            RawSignal::StateTransition { to: LineState::Offhook, .. } => {
                if let Some(id) = state.on_pickup() {
                    info!(attempt = id, "Remote party picked up");
                    self.publish(id, EngineEventKind::PickedUp, json!({}));
                }
                0
            }
            RawSignal::StateTransition { to: LineState::Idle, from } => match state.on_hangup() {
                Hangup::ClearedAfterPickup { id } => {
                    info!(attempt = id, "Answered call ended, attempt cleared");
                    self.publish(id, EngineEventKind::Cleared, json!({ "reason": "picked_up" }));
                    0
                }
                Hangup::Unanswered { id } if self.settings.idle_without_pickup_triggers => {
                    debug!(attempt = id, from = ?from, "Line idle without pickup");
                    let verdict = self.classifier.classify_call_ended();
                    self.decide(state, verdict, at, report_tx)
                }
                _ => 0,
            },
            RawSignal::StateTransition { to: LineState::Ringing, .. } => 0,
            RawSignal::StructuredDisconnect { code } => {
                let verdict = self.classifier.classify_disconnect(code);
                debug!(code = ?code, outcome = %verdict.outcome, "Disconnect classified");
                self.decide(state, verdict, at, report_tx)
            }
            RawSignal::FreeTextNotification { text } => match self.classifier.classify_text(&text) {
                Some(verdict) => self.decide(state, verdict, at, report_tx),
                None => {
                    debug!("Notification text not recognized");
                    0
                }
            },
        }
    }

    fn decide(
        &self,
        state: &mut CallState,
        verdict: Verdict,
        at: Instant,
        report_tx: &mpsc::Sender<WorkerReport>,
    ) -> usize {
        match state.on_outcome(&verdict, at) {
            Decision::NotQualifying { id } => {
                debug!(outcome = %verdict.outcome, "Outcome does not qualify");
                self.publish(
                    id.unwrap_or(0),
                    EngineEventKind::NotQualifying,
                    json!({ "outcome": verdict.outcome, "matched_by": verdict.matched_by }),
                );
                0
            }
            Decision::Suppressed { id, reason } => {
                info!(attempt = id, reason = ?reason, outcome = %verdict.outcome, "Outcome suppressed");
                self.publish(
                    id,
                    EngineEventKind::Suppressed,
                    json!({ "reason": reason, "outcome": verdict.outcome }),
                );
                0
            }
            Decision::Stale { id, age } => {
                warn!(attempt = id, age_ms = age.as_millis() as u64, "Captured number is stale, outcome ignored");
                self.publish(
                    id,
                    EngineEventKind::Stale,
                    json!({ "age_ms": age.as_millis() as u64, "outcome": verdict.outcome }),
                );
                0
            }
            Decision::Trigger {
                id,
                number,
                requires_termination,
                anonymous,
            } => {
                info!(
                    attempt = id,
                    outcome = %verdict.outcome,
                    requires_termination,
                    anonymous,
                    "Redirect triggered"
                );
                self.publish(
                    id,
                    EngineEventKind::Triggered,
                    json!({
                        "outcome": verdict.outcome,
                        "matched_by": verdict.matched_by,
                        "requires_termination": requires_termination,
                        "number": number,
                    }),
                );
                self.spawn_settle(id, number, requires_termination, report_tx.clone());
                1
            }
        }
    }

    /// Terminate (if required) and resolve the number on a worker task.
    fn spawn_settle(
        &self,
        id: u64,
        live: Option<DialedNumber>,
        requires_termination: bool,
        report_tx: mpsc::Sender<WorkerReport>,
    ) {
        let terminators = self.terminators.clone();
        let resolver = self.resolver.clone();
        tokio::spawn(async move {
            let termination = if requires_termination {
                Some(terminators.terminate().await)
            } else {
                None
            };
            let resolution = resolver.resolve(live).await;
            let report = WorkerReport::Resolved {
                id,
                resolution,
                termination,
            };
            if report_tx.send(report).await.is_err() {
                error!(attempt = id, "Engine gone before resolution finished");
            }
        });
    }

    fn spawn_dispatch(&self, id: u64, number: DialedNumber, report_tx: mpsc::Sender<WorkerReport>) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let report = dispatcher.dispatch(&number).await;
            if report_tx.send(WorkerReport::Dispatched { id, report }).await.is_err() {
                error!(attempt = id, "Engine gone before dispatch finished");
            }
        });
    }

    /// Apply a worker result. Returns the number of workers started.
    fn on_report(
        &self,
        state: &mut CallState,
        report: WorkerReport,
        report_tx: &mpsc::Sender<WorkerReport>,
    ) -> usize {
        match report {
            WorkerReport::Resolved {
                id,
                resolution,
                termination,
            } => {
                if let Some(termination) = termination {
                    self.publish(id, EngineEventKind::Terminated, json!(termination));
                }
                match resolution {
                    Some((number, from)) if state.on_resolved(id, &number) => {
                        info!(attempt = id, resolution = ?from, "Dispatching redirect");
                        self.spawn_dispatch(id, number, report_tx.clone());
                        1
                    }
                    None if state.on_resolution_failed(id) => {
                        let err = RedialError::ResolutionFailed { attempt: id };
                        warn!(error = %err, "Redirect abandoned");
                        self.publish(id, EngineEventKind::ResolutionFailed, json!({}));
                        0
                    }
                    _ => {
                        info!(attempt = id, "Attempt superseded during resolution, result discarded");
                        self.publish(id, EngineEventKind::Abandoned, json!({ "stage": "resolution" }));
                        0
                    }
                }
            }
            WorkerReport::Dispatched { id, report } => {
                let kind = if report.exhausted() {
                    error!(attempt = id, error = %RedialError::DispatchExhausted, "Redirect not delivered");
                    EngineEventKind::DispatchExhausted
                } else {
                    EngineEventKind::Dispatched
                };
                self.publish(
                    id,
                    kind,
                    json!({
                        "number": report.number,
                        "step": report.issued_by,
                        "token": report.token,
                        "attempts": report.attempts,
                    }),
                );
                if !state.on_dispatched(id) {
                    debug!(attempt = id, "Attempt superseded while dispatching");
                }
                0
            }
        }
    }

    fn publish(&self, attempt: u64, kind: EngineEventKind, detail: serde_json::Value) {
        // No subscribers is fine.
        let _ = self.events.send(EngineEvent::new(attempt, kind, detail));
    }
}

/// Run `source` on its own task. A source that cannot attach is logged and
/// the engine carries on without it.
pub fn spawn_source(source: Arc<dyn SignalSource>, sink: SignalSink) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = source.name().to_string();
        match source.start(sink).await {
            Ok(()) => debug!(source = %name, "Signal source finished"),
            Err(e) => warn!(source = %name, error = %e, "Signal source unavailable, continuing without it"),
        }
    })
}
