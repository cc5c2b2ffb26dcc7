//! Engine Event Logger
//!
//! Every engine event is written to the `redial_events` target, which the
//! file layer persists as NDJSON.

use chrono::{DateTime, Utc};
use redial_core::{EngineEvent, EngineEventKind};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
pub struct EventLogEntry {
    pub id: String,
    pub attempt: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EngineEventKind,
    /// Detail JSON, redacted when enabled.
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct EventLogger {
    redact: bool,
}

impl EventLogger {
    pub fn new(redact: bool) -> Self {
        Self { redact }
    }

    pub fn entry(&self, event: &EngineEvent) -> EventLogEntry {
        let detail = event.detail.to_string();
        EventLogEntry {
            id: event.id.to_string(),
            attempt: event.attempt,
            timestamp: event.timestamp,
            kind: event.kind,
            detail: if self.redact { redact_sensitive_data(&detail) } else { detail },
        }
    }

    pub fn log_event(&self, event: &EngineEvent) {
        let entry = self.entry(event);
        info!(
            target: "redial_events",
            id = %entry.id,
            attempt = entry.attempt,
            kind = %entry.kind,
            detail = %entry.detail,
            "Engine event"
        );
    }

    /// Log events from `rx` until the engine drops its sender.
    pub async fn run(self, mut rx: broadcast::Receiver<EngineEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
