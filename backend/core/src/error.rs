use thiserror::Error;

/// Top-level error type for the Redial engine.
///
/// Nothing in the engine escalates these to a caller. They are logged where
/// they occur and surfaced as engine events for diagnostics.
#[derive(Debug, Error)]
pub enum RedialError {
    #[error("signal source unavailable ({source_name}): {reason}")]
    SignalUnavailable { source_name: String, reason: String },

    #[error("could not resolve a number for attempt {attempt}")]
    ResolutionFailed { attempt: u64 },

    #[error("call termination failed: {0}")]
    TerminationFailed(String),

    #[error("dispatch step '{step}' could not be issued: {reason}")]
    DispatchAttemptFailed { step: String, reason: String },

    #[error("all dispatch steps failed")]
    DispatchExhausted,

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RedialError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failed_step() {
        let err = RedialError::DispatchAttemptFailed {
            step: "call_deep_link".into(),
            reason: "target application absent".into(),
        };
        assert_eq!(
            err.to_string(),
            "dispatch step 'call_deep_link' could not be issued: target application absent"
        );
    }

    #[test]
    fn anyhow_errors_pass_through() {
        let err: RedialError = anyhow::anyhow!("binder died").into();
        assert_eq!(err.to_string(), "binder died");
    }
}
