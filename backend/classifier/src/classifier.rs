use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use redial_core::{CallOutcome, DisconnectCode, MatchKind, Verdict};

use crate::fuzzy::KeywordMatcher;
use crate::phrases::{default_keywords, default_phrases, KeywordRule, PhraseRule};

/// How notification text is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact allow-list only.
    #[default]
    Exact,
    /// Exact allow-list, then keyword matching on folded tokens.
    Fuzzy,
}

/// Classifier tables and mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierSettings {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default = "default_phrases")]
    pub phrases: Vec<PhraseRule>,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordRule>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            mode: MatchMode::Exact,
            phrases: default_phrases(),
            keywords: default_keywords(),
        }
    }
}

/// Pure mapping from raw outcome signals to verdicts. Holds no call state.
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    mode: MatchMode,
    exact: HashMap<String, PhraseRule>,
    keywords: KeywordMatcher,
}

impl OutcomeClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        let exact = settings
            .phrases
            .into_iter()
            .map(|rule| (rule.text.clone(), rule))
            .collect();
        Self {
            mode: settings.mode,
            exact,
            keywords: KeywordMatcher::new(settings.keywords),
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Classify a structured disconnect code.
    pub fn classify_disconnect(&self, code: DisconnectCode) -> Verdict {
        let (outcome, terminate) = match code {
            DisconnectCode::Busy | DisconnectCode::Congestion => (CallOutcome::Busy, true),
            DisconnectCode::Unknown => (CallOutcome::Unknown, false),
            _ => (CallOutcome::EndedUnanswered, false),
        };
        Verdict::new(outcome, terminate, MatchKind::Structured)
    }

    /// Classify a call that returned to idle without the remote party picking up.
    pub fn classify_call_ended(&self) -> Verdict {
        Verdict::new(CallOutcome::EndedUnanswered, false, MatchKind::CallState)
    }

    /// Classify notification text. `None` means the text is not an outcome.
    pub fn classify_text(&self, text: &str) -> Option<Verdict> {
        if let Some(rule) = self.exact.get(text) {
            return Some(Verdict::new(rule.outcome, rule.terminate, MatchKind::Exact));
        }
        if self.mode == MatchMode::Fuzzy {
            if let Some(rule) = self.keywords.find(text) {
                debug!(keyword = %rule.keyword, outcome = %rule.outcome, "Fuzzy notification match");
                return Some(Verdict::new(rule.outcome, rule.terminate, MatchKind::Fuzzy));
            }
        }
        None
    }

    /// True if `text` would classify to any outcome.
    pub fn recognizes(&self, text: &str) -> bool {
        self.classify_text(text).is_some()
    }
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(ClassifierSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuzzy() -> OutcomeClassifier {
        OutcomeClassifier::new(ClassifierSettings {
            mode: MatchMode::Fuzzy,
            ..Default::default()
        })
    }

    #[test]
    fn structured_codes() {
        let c = OutcomeClassifier::default();
        let busy = c.classify_disconnect(DisconnectCode::Busy);
        assert_eq!(busy.outcome, CallOutcome::Busy);
        assert!(busy.policy.requires_termination);

        let congestion = c.classify_disconnect(DisconnectCode::Congestion);
        assert_eq!(congestion.outcome, CallOutcome::Busy);
        assert!(congestion.policy.requires_termination);

        let no_answer = c.classify_disconnect(DisconnectCode::NoAnswer);
        assert_eq!(no_answer.outcome, CallOutcome::EndedUnanswered);
        assert!(!no_answer.policy.requires_termination);

        assert_eq!(
            c.classify_disconnect(DisconnectCode::Unknown).outcome,
            CallOutcome::Unknown
        );
        assert!(!c.classify_disconnect(DisconnectCode::Unknown).qualifies());
    }

    #[test]
    fn exact_phrases_match_verbatim_only() {
        let c = OutcomeClassifier::default();
        let v = c.classify_text("Линия занята.").unwrap();
        assert_eq!(v.outcome, CallOutcome::Busy);
        assert!(v.policy.requires_termination);
        assert_eq!(v.matched_by, MatchKind::Exact);

        assert!(c.classify_text("линия занята.").is_none());
        assert!(c.classify_text("Линия занята").is_none());
        assert!(c.classify_text(" Line busy.").is_none());
    }

    #[test]
    fn call_ended_phrase_skips_termination() {
        let c = OutcomeClassifier::default();
        let v = c.classify_text("Вызов завершен.").unwrap();
        assert_eq!(v.outcome, CallOutcome::EndedUnanswered);
        assert!(!v.policy.requires_termination);
    }

    #[test]
    fn fuzzy_mode_widens_recall() {
        let c = fuzzy();
        let v = c.classify_text("the line is BUSY").unwrap();
        assert_eq!(v.outcome, CallOutcome::Busy);
        assert_eq!(v.matched_by, MatchKind::Fuzzy);

        // exact table still wins first
        assert_eq!(c.classify_text("Line busy.").unwrap().matched_by, MatchKind::Exact);
        assert!(c.classify_text("Wi-Fi calling available").is_none());
    }

    #[test]
    fn exact_mode_ignores_keywords() {
        let c = OutcomeClassifier::default();
        assert!(!c.recognizes("the line is BUSY"));
    }

    #[test]
    fn custom_phrases_replace_defaults() {
        let c = OutcomeClassifier::new(ClassifierSettings {
            phrases: vec![PhraseRule {
                text: "Línea ocupada.".into(),
                outcome: CallOutcome::Busy,
                terminate: true,
            }],
            ..Default::default()
        });
        assert!(c.recognizes("Línea ocupada."));
        assert!(!c.recognizes("Line busy."));
    }
}
