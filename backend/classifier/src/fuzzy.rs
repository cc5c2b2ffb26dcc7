//! Weak, recall-oriented matching for notification text.
//!
//! Text is folded (NFD, combining marks dropped, lowercased) and split into
//! letter/digit tokens; a keyword hits when it is a substring of any token.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::phrases::KeywordRule;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

/// Fold case and diacritics.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Folded tokens of `text`.
pub fn tokens(text: &str) -> Vec<String> {
    let folded = fold(text);
    TOKEN_RE
        .find_iter(&folded)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Keyword table with keywords folded once up front.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    rules: Vec<(String, KeywordRule)>,
}

impl KeywordMatcher {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| (fold(&rule.keyword), rule))
            .filter(|(folded, _)| !folded.is_empty())
            .collect();
        Self { rules }
    }

    /// First rule (in table order) whose keyword occurs in a token.
    pub fn find(&self, text: &str) -> Option<&KeywordRule> {
        let tokens = tokens(text);
        if tokens.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|(folded, _)| tokens.iter().any(|t| t.contains(folded.as_str())))
            .map(|(_, rule)| rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::default_keywords;
    use redial_core::CallOutcome;

    #[test]
    fn folds_case_and_diacritics() {
        assert_eq!(fold("Occupé"), "occupe");
        assert_eq!(fold("MEŞGUL"), "mesgul");
        assert_eq!(fold("Вызов завершён"), "вызов завершен");
    }

    #[test]
    fn splits_on_punctuation() {
        assert_eq!(tokens("Line busy... (2)"), vec!["line", "busy", "2"]);
    }

    #[test]
    fn finds_keywords_across_languages() {
        let matcher = KeywordMatcher::new(default_keywords());
        let hit = |t: &str| matcher.find(t).map(|r| r.outcome);
        assert_eq!(hit("LINE IS BUSY"), Some(CallOutcome::Busy));
        assert_eq!(hit("Ligne occupée"), Some(CallOutcome::Busy));
        assert_eq!(hit("Abonnent ist besetzt"), Some(CallOutcome::Busy));
        assert_eq!(hit("Llamada desviada"), Some(CallOutcome::Forwarded));
        assert_eq!(hit("Вызов завершён"), Some(CallOutcome::EndedUnanswered));
        assert_eq!(hit("Battery low"), None);
    }

    #[test]
    fn table_order_breaks_ties() {
        let matcher = KeywordMatcher::new(default_keywords());
        let rule = matcher.find("Busy, call forwarded").unwrap();
        assert_eq!(rule.outcome, CallOutcome::Forwarded);
    }
}
