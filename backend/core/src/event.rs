use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of one engine decision.
/// Every capture, suppression, hand-off and failure is published as an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: Uuid,
    /// Call attempt the event belongs to; 0 when no attempt was live.
    pub attempt: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EngineEventKind,
    pub detail: serde_json::Value,
}

/// Categories of engine decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineEventKind {
    /// A dialed number was captured and a new attempt opened
    Captured,
    /// A repeated capture of the current number was coalesced
    EchoIgnored,
    /// The remote party picked up
    PickedUp,
    /// An attempt ended without needing a redirect
    Cleared,
    /// An outcome signal did not classify as a failure
    NotQualifying,
    /// A qualifying outcome was suppressed by a guard
    Suppressed,
    /// An outcome arrived for a capture older than the staleness window
    Stale,
    /// A qualifying outcome started the redirect
    Triggered,
    /// The GSM leg was (or failed to be) torn down
    Terminated,
    /// No number could be resolved for the attempt
    ResolutionFailed,
    /// In-flight work finished for an attempt that was already superseded
    Abandoned,
    /// The messaging application hand-off was issued
    Dispatched,
    /// Every dispatch step failed to issue
    DispatchExhausted,
}

impl EngineEvent {
    pub fn new(attempt: u64, kind: EngineEventKind, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt,
            timestamp: Utc::now(),
            kind,
            detail,
        }
    }
}

impl std::fmt::Display for EngineEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
