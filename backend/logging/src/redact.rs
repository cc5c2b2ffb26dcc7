//! Log Redaction
//!
//! Phone numbers are masked down to their last two digits before they reach
//! log text.

use regex::Regex;
use std::sync::LazyLock;

/// Digit runs that look like phone numbers, with common separators.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\-\s().]{5,}\d").unwrap());

const VISIBLE_DIGITS: usize = 2;

/// Mask every digit of `number` except the last two. Separators are kept.
pub fn redact_number(number: &str) -> String {
    let total = number.chars().filter(|c| c.is_ascii_digit()).count();
    let mut seen = 0;
    number
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen + VISIBLE_DIGITS > total { c } else { '*' }
            } else {
                c
            }
        })
        .collect()
}

/// Mask phone-number-like runs in free text.
pub fn redact_sensitive_data(input: &str) -> String {
    PHONE_RE
        .replace_all(input, |caps: &regex::Captures| redact_number(&caps[0]))
        .into_owned()
}
