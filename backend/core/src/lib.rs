pub mod channel;
pub mod error;
pub mod event;
pub mod number;
pub mod signal;
pub mod traits;
pub mod types;

pub use channel::{SignalBus, SignalSink};
pub use error::RedialError;
pub use event::{EngineEvent, EngineEventKind};
pub use number::{tel_uri_address, DialedNumber, NumberPlan};
pub use signal::{CaptureSource, RawSignal, SignalEvent};
pub use traits::{CallHistory, CallTerminator, HistoryRecord, SignalSource};
pub use types::{ActionPolicy, CallOutcome, DisconnectCode, LineState, MatchKind, Verdict};
