//! Outcome notifications: short-lived status messages shown by the call UI.
//!
//! Only notifications from allow-listed packages whose text the classifier
//! recognizes are forwarded; everything else on screen is noise.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use redial_classifier::OutcomeClassifier;
use redial_core::{RawSignal, RedialError, SignalSink, SignalSource};

/// Packages whose notifications are considered call outcome candidates.
pub const DEFAULT_PACKAGES: [&str; 4] = [
    "com.android.server.telecom",
    "com.samsung.android.incallui",
    "com.samsung.android.dialer",
    "com.android.phone",
];

pub fn default_packages() -> Vec<String> {
    DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect()
}

/// A notification surfaced by the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub package: String,
    pub text: String,
}

pub struct OutcomeNotification {
    packages: HashSet<String>,
    classifier: Arc<OutcomeClassifier>,
    rx: Mutex<Option<mpsc::Receiver<Notification>>>,
}

impl OutcomeNotification {
    pub fn new(
        packages: Vec<String>,
        classifier: Arc<OutcomeClassifier>,
        rx: mpsc::Receiver<Notification>,
    ) -> Self {
        Self {
            packages: packages.into_iter().collect(),
            classifier,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Signal for `notification`, if it is an outcome candidate.
    pub fn observe(&self, notification: Notification) -> Option<RawSignal> {
        if !self.packages.contains(&notification.package) {
            return None;
        }
        if !self.classifier.recognizes(&notification.text) {
            debug!(package = %notification.package, "Notification text not recognized");
            return None;
        }
        Some(RawSignal::FreeTextNotification {
            text: notification.text,
        })
    }
}

#[async_trait]
impl SignalSource for OutcomeNotification {
    fn name(&self) -> &str {
        "outcome_notification"
    }

    async fn start(&self, sink: SignalSink) -> Result<(), RedialError> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| RedialError::unavailable(self.name(), "notification stream already attached"))?;

        info!(packages = self.packages.len(), "Outcome notification observer attached");
        while let Some(notification) = rx.recv().await {
            if let Some(signal) = self.observe(notification) {
                sink.emit(signal);
            }
        }
        info!("Notification stream closed, observer stopping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redial_classifier::{ClassifierSettings, MatchMode};

    fn observer(mode: MatchMode) -> OutcomeNotification {
        let classifier = OutcomeClassifier::new(ClassifierSettings {
            mode,
            ..Default::default()
        });
        let (_tx, rx) = mpsc::channel(1);
        OutcomeNotification::new(default_packages(), Arc::new(classifier), rx)
    }

    fn note(package: &str, text: &str) -> Notification {
        Notification {
            package: package.into(),
            text: text.into(),
        }
    }

    #[test]
    fn forwards_recognized_text_from_allowed_package() {
        let o = observer(MatchMode::Exact);
        let signal = o.observe(note("com.android.phone", "Номер занят.")).unwrap();
        assert_eq!(
            signal,
            RawSignal::FreeTextNotification {
                text: "Номер занят.".into()
            }
        );
    }

    #[test]
    fn ignores_other_packages() {
        let o = observer(MatchMode::Exact);
        assert!(o.observe(note("com.example.chat", "Line busy.")).is_none());
    }

    #[test]
    fn ignores_unrecognized_text() {
        let o = observer(MatchMode::Exact);
        assert!(o.observe(note("com.android.phone", "Call recording started")).is_none());
        assert!(o.observe(note("com.android.phone", "line is busy")).is_none());
    }

    #[test]
    fn fuzzy_mode_forwards_keyword_hits() {
        let o = observer(MatchMode::Fuzzy);
        assert!(o.observe(note("com.android.phone", "line is busy")).is_some());
    }
}
