use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::number::DialedNumber;
use crate::types::{DisconnectCode, LineState};

/// Where a dialed number was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// A call intent carrying a `tel:` URI.
    CallIntent,
    /// The telephony service reporting the outgoing address.
    OutgoingNumber,
}

/// A narrow, platform-independent signal emitted by a source.
///
/// Signals carry no call identifier; the engine correlates them by recency
/// against the single live call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    Dialed {
        number: DialedNumber,
        via: CaptureSource,
    },
    StateTransition {
        from: Option<LineState>,
        to: LineState,
    },
    StructuredDisconnect {
        code: DisconnectCode,
    },
    FreeTextNotification {
        text: String,
    },
}

impl RawSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dialed { .. } => "dialed",
            Self::StateTransition { .. } => "state_transition",
            Self::StructuredDisconnect { .. } => "structured_disconnect",
            Self::FreeTextNotification { .. } => "free_text_notification",
        }
    }
}

/// A signal stamped with its arrival time and the name of its source.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    pub signal: RawSignal,
    pub at: Instant,
    pub origin: String,
}

impl SignalEvent {
    pub fn new(origin: impl Into<String>, signal: RawSignal) -> Self {
        Self::at(origin, signal, Instant::now())
    }

    pub fn at(origin: impl Into<String>, signal: RawSignal, at: Instant) -> Self {
        Self {
            signal,
            at,
            origin: origin.into(),
        }
    }
}
