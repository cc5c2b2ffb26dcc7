//! Live capture: the telephony collaborator's event stream.
//!
//! The dialed address is taken from the call placement itself (a call intent
//! or the telephony service's outgoing address), which makes it the most
//! trusted number source. Call-state changes and disconnect reasons arrive
//! on the same stream and are forwarded as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use redial_core::{
    tel_uri_address, CaptureSource, DialedNumber, DisconnectCode, LineState, NumberPlan,
    RawSignal, RedialError, SignalSink, SignalSource,
};

/// Intent actions that place a call.
pub const CALL_ACTIONS: [&str; 2] = [
    "android.intent.action.CALL",
    "android.intent.action.CALL_PRIVILEGED",
];

/// Events published by the telephony collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelephonyEvent {
    CallStateChanged {
        #[serde(default)]
        from: Option<LineState>,
        to: LineState,
    },
    DisconnectReason {
        code: DisconnectCode,
    },
    OutgoingNumberObserved {
        number: String,
    },
    CallIntent {
        action: String,
        data: Option<String>,
    },
}

/// Translates telephony events into raw signals.
pub struct LiveCapture {
    plan: NumberPlan,
    rx: Mutex<Option<mpsc::Receiver<TelephonyEvent>>>,
}

impl LiveCapture {
    pub fn new(plan: NumberPlan, rx: mpsc::Receiver<TelephonyEvent>) -> Self {
        Self {
            plan,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Map one telephony event to a signal; `None` if it carries nothing usable.
    pub fn capture(&self, event: TelephonyEvent) -> Option<RawSignal> {
        match event {
            TelephonyEvent::CallStateChanged { from, to } => {
                Some(RawSignal::StateTransition { from, to })
            }
            TelephonyEvent::DisconnectReason { code } => {
                Some(RawSignal::StructuredDisconnect { code })
            }
            TelephonyEvent::OutgoingNumberObserved { number } => {
                let raw = tel_uri_address(&number).unwrap_or(number);
                self.dialed(&raw, CaptureSource::OutgoingNumber)
            }
            TelephonyEvent::CallIntent { action, data } => {
                if !CALL_ACTIONS.contains(&action.as_str()) {
                    return None;
                }
                let address = tel_uri_address(data.as_deref()?)?;
                self.dialed(&address, CaptureSource::CallIntent)
            }
        }
    }

    fn dialed(&self, raw: &str, via: CaptureSource) -> Option<RawSignal> {
        let number = DialedNumber::parse(raw, &self.plan)?;
        Some(RawSignal::Dialed { number, via })
    }
}

#[async_trait]
impl SignalSource for LiveCapture {
    fn name(&self) -> &str {
        "live_capture"
    }

    async fn start(&self, sink: SignalSink) -> Result<(), RedialError> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| RedialError::unavailable(self.name(), "telephony stream already attached"))?;

        info!("Live capture attached");
        while let Some(event) = rx.recv().await {
            match self.capture(event) {
                Some(signal) => {
                    sink.emit(signal);
                }
                None => debug!("Telephony event carried no usable signal"),
            }
        }
        info!("Telephony stream closed, live capture stopping");
        Ok(())
    }
}
