//! Curated phrase and keyword tables for call UI notifications.
//!
//! Exact phrases are compared byte for byte: capitalization and the trailing
//! period are part of the phrase. Keywords feed the weaker fuzzy mode and
//! are stored unfolded; the classifier folds them on construction.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use redial_core::CallOutcome;

/// An exact notification text pre-tagged with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseRule {
    pub text: String,
    pub outcome: CallOutcome,
    /// Hang up the GSM leg before redirecting.
    #[serde(default)]
    pub terminate: bool,
}

/// A keyword matched as a substring of a folded token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRule {
    pub keyword: String,
    pub outcome: CallOutcome,
    #[serde(default)]
    pub terminate: bool,
}

fn phrase(text: &str, outcome: CallOutcome, terminate: bool) -> PhraseRule {
    PhraseRule {
        text: text.to_string(),
        outcome,
        terminate,
    }
}

fn keyword(keyword: &str, outcome: CallOutcome, terminate: bool) -> KeywordRule {
    KeywordRule {
        keyword: keyword.to_string(),
        outcome,
        terminate,
    }
}

static DEFAULT_PHRASES: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    use CallOutcome::*;
    vec![
        // ru
        phrase("Вызов завершен.", EndedUnanswered, false),
        phrase("Вызов переадресован.", Forwarded, true),
        phrase("Линия занята.", Busy, true),
        phrase("Номер занят.", Busy, true),
        // en
        phrase("Call ended.", EndedUnanswered, false),
        phrase("Call forwarded.", Forwarded, true),
        phrase("Line busy.", Busy, true),
        phrase("Number busy.", Busy, true),
    ]
});

// Order is priority: the first rule whose keyword hits wins.
static DEFAULT_KEYWORDS: Lazy<Vec<KeywordRule>> = Lazy::new(|| {
    use CallOutcome::*;
    vec![
        keyword("forward", Forwarded, true),
        keyword("переадрес", Forwarded, true),
        keyword("desviad", Forwarded, true),
        keyword("weitergeleitet", Forwarded, true),
        keyword("transfere", Forwarded, true),
        keyword("inoltrat", Forwarded, true),
        keyword("busy", Busy, true),
        keyword("занят", Busy, true),
        keyword("ocupad", Busy, true),
        keyword("besetzt", Busy, true),
        keyword("occupé", Busy, true),
        keyword("occupat", Busy, true),
        keyword("meşgul", Busy, true),
        keyword("ended", EndedUnanswered, false),
        keyword("завершен", EndedUnanswered, false),
        keyword("finaliz", EndedUnanswered, false),
        keyword("beendet", EndedUnanswered, false),
        keyword("terminé", EndedUnanswered, false),
        keyword("terminat", EndedUnanswered, false),
    ]
});

/// Built-in exact phrases (ru, en).
pub fn default_phrases() -> Vec<PhraseRule> {
    DEFAULT_PHRASES.clone()
}

/// Built-in multilingual keyword table for fuzzy matching.
pub fn default_keywords() -> Vec<KeywordRule> {
    DEFAULT_KEYWORDS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_forwarded_phrases_require_termination() {
        for rule in default_phrases() {
            let expect = matches!(rule.outcome, CallOutcome::Busy | CallOutcome::Forwarded);
            assert_eq!(rule.terminate, expect, "phrase {:?}", rule.text);
        }
    }

    #[test]
    fn phrase_rules_deserialize_from_yaml() {
        let yaml = "- text: \"Línea ocupada.\"\n  outcome: busy\n  terminate: true\n- text: \"Llamada finalizada.\"\n  outcome: ended_unanswered\n";
        let rules: Vec<PhraseRule> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].outcome, CallOutcome::Busy);
        assert!(rules[0].terminate);
        assert!(!rules[1].terminate);
    }
}
