//! Structured logging for Redial.
//!
//! Console and rolling NDJSON file output, phone-number redaction, and a
//! logger that records every engine event.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger};
pub use logger::{init_logger, LogOptions};
pub use redact::{redact_number, redact_sensitive_data};
