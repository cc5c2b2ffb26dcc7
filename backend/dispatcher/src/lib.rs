//! `redial-dispatcher` — hands a resolved number to the messaging application.
//!
//! Provides:
//! - The ordered, at-most-once-per-step fallback chain (`ActionDispatcher`)
//! - The `AppLauncher` seam and its request type
//! - Command-backed and dry-run launchers and terminators

pub mod dispatcher;
pub mod launch;
pub mod process;

pub use dispatcher::{ActionDispatcher, DispatchMode, DispatchReport, DispatcherSettings, StepAttempt};
pub use launch::{AppLauncher, DispatchStep, LaunchError, LaunchRequest};
pub use process::{
    adb_end_call, adb_templates, CommandLauncher, CommandTemplate, CommandTerminator, LogLauncher,
    LogTerminator,
};
