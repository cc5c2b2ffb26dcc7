//! Ordered, best-effort hand-off to the messaging application.
//!
//! A step is abandoned for the next one only when it could not be issued at
//! all. An issued step ends the chain; there is no delivery confirmation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use redial_core::{DialedNumber, RedialError};

use crate::launch::{AppLauncher, DispatchStep, LaunchRequest};

const ACTION_VIEW: &str = "android.intent.action.VIEW";
const ACTION_SENDTO: &str = "android.intent.action.SENDTO";
const ACTION_MAIN: &str = "android.intent.action.MAIN";

/// Which hand-off the chain starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Start a call in the target application.
    #[default]
    Call,
    /// Call-avoidant: only open the chat.
    Chat,
}

impl DispatchMode {
    pub fn steps(self) -> &'static [DispatchStep] {
        match self {
            Self::Call => &[
                DispatchStep::CallDeepLink,
                DispatchStep::ChatOpen,
                DispatchStep::ConversationOpen,
            ],
            Self::Chat => &[DispatchStep::ChatOpen, DispatchStep::ConversationOpen],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherSettings {
    #[serde(default)]
    pub mode: DispatchMode,
    pub target_package: String,
    pub deep_link_base: String,
    pub conversation_component: String,
    pub identity_suffix: String,
    /// Attach a fresh token so repeated hand-offs to one number are not coalesced.
    pub anti_cache: bool,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Call,
            target_package: "com.whatsapp".to_string(),
            deep_link_base: "https://wa.me/".to_string(),
            conversation_component: "com.whatsapp.Conversation".to_string(),
            identity_suffix: "@s.whatsapp.net".to_string(),
            anti_cache: true,
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAttempt {
    pub step: DispatchStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened during one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub number: DialedNumber,
    pub token: Option<String>,
    pub attempts: Vec<StepAttempt>,
    pub issued_by: Option<DispatchStep>,
}

impl DispatchReport {
    pub fn exhausted(&self) -> bool {
        self.issued_by.is_none()
    }

    pub fn into_result(self) -> Result<DispatchStep, RedialError> {
        self.issued_by.ok_or(RedialError::DispatchExhausted)
    }
}

pub struct ActionDispatcher {
    settings: DispatcherSettings,
    launcher: Arc<dyn AppLauncher>,
}

impl ActionDispatcher {
    pub fn new(settings: DispatcherSettings, launcher: Arc<dyn AppLauncher>) -> Self {
        Self { settings, launcher }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Build the launch request for `step`.
    pub fn request_for(&self, step: DispatchStep, number: &DialedNumber, token: Option<&str>) -> LaunchRequest {
        let s = &self.settings;
        let mut extras = BTreeMap::new();
        if let Some(token) = token {
            extras.insert("token".to_string(), token.to_string());
        }

        match step {
            DispatchStep::CallDeepLink => {
                let mut uri = format!("{}{}?call", s.deep_link_base, number);
                if let Some(token) = token {
                    uri.push_str("&t=");
                    uri.push_str(token);
                }
                LaunchRequest {
                    step,
                    action: ACTION_VIEW.to_string(),
                    uri: Some(uri),
                    package: Some(s.target_package.clone()),
                    component: None,
                    extras,
                    new_task: true,
                }
            }
            DispatchStep::ChatOpen => LaunchRequest {
                step,
                action: ACTION_SENDTO.to_string(),
                uri: Some(format!("smsto:{}", number)),
                package: Some(s.target_package.clone()),
                component: None,
                extras,
                new_task: true,
            },
            DispatchStep::ConversationOpen => {
                extras.insert("jid".to_string(), format!("{}{}", number, s.identity_suffix));
                LaunchRequest {
                    step,
                    action: ACTION_MAIN.to_string(),
                    uri: None,
                    package: Some(s.target_package.clone()),
                    component: Some(s.conversation_component.clone()),
                    extras,
                    new_task: true,
                }
            }
        }
    }

    /// Walk the chain for `number`. Never fails; inspect the report.
    pub async fn dispatch(&self, number: &DialedNumber) -> DispatchReport {
        let token = self
            .settings
            .anti_cache
            .then(|| Uuid::new_v4().simple().to_string());
        let mut report = DispatchReport {
            number: number.clone(),
            token: token.clone(),
            attempts: Vec::new(),
            issued_by: None,
        };

        for &step in self.settings.mode.steps() {
            let request = self.request_for(step, number, token.as_deref());
            debug!(step = %step, launcher = self.launcher.name(), "Issuing launch");
            match self.launcher.launch(&request).await {
                Ok(()) => {
                    info!(step = %step, "Hand-off issued");
                    report.attempts.push(StepAttempt { step, error: None });
                    report.issued_by = Some(step);
                    return report;
                }
                Err(e) => {
                    let err = RedialError::DispatchAttemptFailed {
                        step: step.to_string(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Dispatch step failed, trying next");
                    report.attempts.push(StepAttempt {
                        step,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        warn!(attempts = report.attempts.len(), "All dispatch steps failed");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::LaunchError;
    use async_trait::async_trait;
    use redial_core::NumberPlan;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// Records every request; fails the configured steps.
    struct ScriptedLauncher {
        failing: HashSet<DispatchStep>,
        seen: Mutex<Vec<LaunchRequest>>,
    }

    impl ScriptedLauncher {
        fn failing(steps: &[DispatchStep]) -> Arc<Self> {
            Arc::new(Self {
                failing: steps.iter().copied().collect(),
                seen: Mutex::new(Vec::new()),
            })
        }

        async fn steps(&self) -> Vec<DispatchStep> {
            self.seen.lock().await.iter().map(|r| r.step).collect()
        }
    }

    #[async_trait]
    impl AppLauncher for ScriptedLauncher {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
            self.seen.lock().await.push(request.clone());
            if self.failing.contains(&request.step) {
                Err(LaunchError::NotInstalled("com.whatsapp".into()))
            } else {
                Ok(())
            }
        }
    }

    fn number() -> DialedNumber {
        DialedNumber::parse("15550100", &NumberPlan::default()).unwrap()
    }

    fn dispatcher(launcher: Arc<ScriptedLauncher>, mode: DispatchMode) -> ActionDispatcher {
        ActionDispatcher::new(
            DispatcherSettings {
                mode,
                ..Default::default()
            },
            launcher,
        )
    }

    #[tokio::test]
    async fn first_step_wins() {
        let launcher = ScriptedLauncher::failing(&[]);
        let report = dispatcher(launcher.clone(), DispatchMode::Call)
            .dispatch(&number())
            .await;
        assert_eq!(report.issued_by, Some(DispatchStep::CallDeepLink));
        assert_eq!(launcher.steps().await, vec![DispatchStep::CallDeepLink]);

        let seen = launcher.seen.lock().await;
        let uri = seen[0].uri.as_deref().unwrap();
        assert!(uri.starts_with("https://wa.me/15550100?call&t="));
        assert_eq!(seen[0].package.as_deref(), Some("com.whatsapp"));
    }

    #[tokio::test]
    async fn falls_through_in_order_without_repeats() {
        let launcher = ScriptedLauncher::failing(&[DispatchStep::CallDeepLink]);
        let report = dispatcher(launcher.clone(), DispatchMode::Call)
            .dispatch(&number())
            .await;
        assert_eq!(report.issued_by, Some(DispatchStep::ChatOpen));
        assert_eq!(
            launcher.steps().await,
            vec![DispatchStep::CallDeepLink, DispatchStep::ChatOpen]
        );

        let launcher =
            ScriptedLauncher::failing(&[DispatchStep::CallDeepLink, DispatchStep::ChatOpen]);
        let report = dispatcher(launcher.clone(), DispatchMode::Call)
            .dispatch(&number())
            .await;
        assert_eq!(report.issued_by, Some(DispatchStep::ConversationOpen));
        assert_eq!(
            launcher.steps().await,
            vec![
                DispatchStep::CallDeepLink,
                DispatchStep::ChatOpen,
                DispatchStep::ConversationOpen
            ]
        );
        let seen = launcher.seen.lock().await;
        assert_eq!(seen[2].extra("jid"), Some("15550100@s.whatsapp.net"));
        assert_eq!(seen[2].component.as_deref(), Some("com.whatsapp.Conversation"));
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_failure() {
        let launcher = ScriptedLauncher::failing(&[
            DispatchStep::CallDeepLink,
            DispatchStep::ChatOpen,
            DispatchStep::ConversationOpen,
        ]);
        let report = dispatcher(launcher.clone(), DispatchMode::Call)
            .dispatch(&number())
            .await;
        assert!(report.exhausted());
        assert_eq!(report.attempts.len(), 3);
        assert!(report.attempts.iter().all(|a| a.error.is_some()));
        assert!(matches!(
            report.into_result(),
            Err(RedialError::DispatchExhausted)
        ));
    }

    #[tokio::test]
    async fn chat_mode_skips_call_link() {
        let launcher = ScriptedLauncher::failing(&[]);
        let report = dispatcher(launcher.clone(), DispatchMode::Chat)
            .dispatch(&number())
            .await;
        assert_eq!(report.issued_by, Some(DispatchStep::ChatOpen));
        let seen = launcher.seen.lock().await;
        assert_eq!(seen[0].uri.as_deref(), Some("smsto:15550100"));
    }

    #[tokio::test]
    async fn every_dispatch_gets_a_fresh_token() {
        let launcher = ScriptedLauncher::failing(&[]);
        let d = dispatcher(launcher.clone(), DispatchMode::Call);
        let a = d.dispatch(&number()).await.token.unwrap();
        let b = d.dispatch(&number()).await.token.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn anti_cache_can_be_disabled() {
        let launcher = ScriptedLauncher::failing(&[]);
        let d = ActionDispatcher::new(
            DispatcherSettings {
                anti_cache: false,
                ..Default::default()
            },
            launcher.clone(),
        );
        let report = d.dispatch(&number()).await;
        assert!(report.token.is_none());
        let seen = launcher.seen.lock().await;
        assert_eq!(seen[0].uri.as_deref(), Some("https://wa.me/15550100?call"));
        assert!(seen[0].extras.is_empty());
    }
}
