//! `redial-engine` — the trigger engine.
//!
//! One decision loop owns the call state. Signal sources, the resolver, the
//! termination chain and the dispatcher all run on their own tasks and only
//! talk to the loop through channels.

pub mod engine;
pub mod resolver;
pub mod state;
pub mod termination;

pub use engine::{spawn_source, EngineSettings, TriggerEngine};
pub use resolver::{NumberResolver, Resolution};
pub use state::{CallAttempt, CallState, Guards, Phase};
pub use termination::{TerminationChain, TerminationOutcome};
