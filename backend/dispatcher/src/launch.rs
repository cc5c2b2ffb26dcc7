use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of the hand-off chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStep {
    /// Deep link that starts a call to the number.
    CallDeepLink,
    /// Open the chat addressed to the number.
    ChatOpen,
    /// Open the conversation screen by remote identity.
    ConversationOpen,
}

impl DispatchStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallDeepLink => "call_deep_link",
            Self::ChatOpen => "chat_open",
            Self::ConversationOpen => "conversation_open",
        }
    }
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform-neutral description of one launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub step: DispatchStep,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
    /// Start the target in a new task.
    pub new_task: bool,
}

impl LaunchRequest {
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// Why a launch could not be issued.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("target application not installed: {0}")]
    NotInstalled(String),

    #[error("launch rejected: {0}")]
    Rejected(String),

    #[error("launcher does not support step '{0}'")]
    Unsupported(DispatchStep),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The external-application collaborator.
///
/// Fire-and-forget: `Ok` only means the launch was issued, not that the
/// target did anything with it.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    fn name(&self) -> &str;

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names() {
        assert_eq!(DispatchStep::CallDeepLink.to_string(), "call_deep_link");
        let json = serde_json::to_string(&DispatchStep::ConversationOpen).unwrap();
        assert_eq!(json, "\"conversation_open\"");
    }
}
