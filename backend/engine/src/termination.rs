//! Ordered list of hang-up mechanisms; the first that reports success wins.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use redial_core::{CallTerminator, RedialError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationOutcome {
    pub ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    pub tried: usize,
}

#[derive(Clone, Default)]
pub struct TerminationChain {
    terminators: Vec<Arc<dyn CallTerminator>>,
}

impl TerminationChain {
    pub fn new(terminators: Vec<Arc<dyn CallTerminator>>) -> Self {
        Self { terminators }
    }

    pub fn is_empty(&self) -> bool {
        self.terminators.is_empty()
    }

    /// Try each mechanism in order. Failures are logged, never returned.
    pub async fn terminate(&self) -> TerminationOutcome {
        let mut tried = 0;
        for terminator in &self.terminators {
            tried += 1;
            match terminator.terminate_current_call().await {
                Ok(true) => {
                    info!(terminator = terminator.name(), "Call terminated");
                    return TerminationOutcome {
                        ended: true,
                        by: Some(terminator.name().to_string()),
                        tried,
                    };
                }
                Ok(false) => debug!(terminator = terminator.name(), "Terminator did not end the call"),
                Err(e) => {
                    let err = RedialError::TerminationFailed(format!("{}: {e}", terminator.name()));
                    warn!(error = %err, "Terminator failed");
                }
            }
        }
        if tried > 0 {
            warn!(tried, "No terminator ended the call, dispatching anyway");
        }
        TerminationOutcome {
            ended: false,
            by: None,
            tried,
        }
    }
}
