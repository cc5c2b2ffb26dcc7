use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::signal::{RawSignal, SignalEvent};

/// Default channel buffer size for signal delivery.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// The bus connecting every signal source to the trigger engine.
///
/// All sources share clones of one `Sender`; the engine owns the single
/// `Receiver`, so every signal is applied by one decision loop in arrival
/// order.
pub struct SignalBus {
    pub signal_tx: mpsc::Sender<SignalEvent>,
    pub signal_rx: Option<mpsc::Receiver<SignalEvent>>,
}

impl SignalBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(buffer.max(1));
        info!(buffer_size = buffer, "SignalBus initialized");
        Self {
            signal_tx,
            signal_rx: Some(signal_rx),
        }
    }

    /// Take the engine receiver (can only be called once).
    pub fn take_signal_rx(&mut self) -> Option<mpsc::Receiver<SignalEvent>> {
        debug!("Signal receiver taken");
        self.signal_rx.take()
    }

    /// A sink that stamps signals with `origin`.
    pub fn sink(&self, origin: impl Into<String>) -> SignalSink {
        SignalSink::new(origin, self.signal_tx.clone())
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a source uses to push signals into the engine.
///
/// `emit` never waits: signal delivery must not delay the platform code
/// that observed it (for example, call placement).
#[derive(Clone)]
pub struct SignalSink {
    origin: String,
    tx: mpsc::Sender<SignalEvent>,
}

impl SignalSink {
    pub fn new(origin: impl Into<String>, tx: mpsc::Sender<SignalEvent>) -> Self {
        Self {
            origin: origin.into(),
            tx,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Stamp `signal` with the current instant and enqueue it.
    /// Returns false if the signal was dropped.
    pub fn emit(&self, signal: RawSignal) -> bool {
        self.emit_event(SignalEvent::new(self.origin.clone(), signal))
    }

    /// Enqueue an already stamped event.
    pub fn emit_event(&self, event: SignalEvent) -> bool {
        let kind = event.signal.kind();
        match self.tx.try_send(event) {
            Ok(()) => {
                debug!(origin = %self.origin, signal = kind, "Signal emitted");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(origin = %self.origin, signal = kind, "Signal queue full, dropping signal");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(origin = %self.origin, signal = kind, "Engine gone, dropping signal");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
