use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::SignalSink;
use crate::error::RedialError;

/// A platform adapter that observes some subsystem and emits `RawSignal`s.
///
/// Each source runs in its own Tokio task. A source that cannot attach
/// returns `SignalUnavailable`; the engine keeps running without it.
#[async_trait]
pub trait SignalSource: Send + Sync + 'static {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Forward signals into `sink` until the underlying stream ends.
    async fn start(&self, sink: SignalSink) -> Result<(), RedialError>;
}

/// One outgoing call record from the device call log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Number exactly as logged (not yet normalized).
    pub number: String,
    pub placed_at: DateTime<Utc>,
}

/// Pull-based access to the device call history.
#[async_trait]
pub trait CallHistory: Send + Sync {
    fn name(&self) -> &str;

    /// Most recent outgoing record placed within `window` of now, if any.
    async fn lookup_last_outgoing(&self, window: Duration) -> Result<Option<HistoryRecord>>;
}

/// One mechanism for hanging up the current GSM call.
#[async_trait]
pub trait CallTerminator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `Ok(true)` if the mechanism reports the call was ended.
    async fn terminate_current_call(&self) -> Result<bool>;
}
