//! `redial-classifier` — maps raw outcome signals to call outcome verdicts.
//!
//! Provides:
//! - Structured disconnect-code mapping
//! - Exact-match allow-list for localized call UI notifications
//! - An opt-in fuzzy mode (folded keyword substrings) for broader recall

pub mod classifier;
pub mod fuzzy;
pub mod phrases;

pub use classifier::{ClassifierSettings, MatchMode, OutcomeClassifier};
pub use phrases::{default_keywords, default_phrases, KeywordRule, PhraseRule};
