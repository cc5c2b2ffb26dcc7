//! Signal sources feeding the trigger engine.
//!
//! `LiveCapture` and `OutcomeNotification` push signals through a
//! `SignalSink`; `CallHistoryLookup` is pulled by the engine's resolver.

pub mod history;
pub mod live_capture;
pub mod notification;

pub use history::{CallDirection, CallHistoryLookup, InMemoryCallLog};
pub use live_capture::{LiveCapture, TelephonyEvent, CALL_ACTIONS};
pub use notification::{default_packages, Notification, OutcomeNotification, DEFAULT_PACKAGES};
