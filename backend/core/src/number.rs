//! Number normalization: raw dialed or logged strings to canonical digits.
//!
//! A canonical number is digits only, country-code first, with no `+` and no
//! separators. The numbering plan decides how domestic forms are expanded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Country-code aware numbering plan used to canonicalize numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberPlan {
    /// Country code digits that prefix every canonical number.
    pub country_code: String,
    /// Domestic trunk prefix replaced by the country code (may be empty).
    pub trunk_prefix: String,
    /// Length of a domestic subscriber number without any prefix.
    pub domestic_length: usize,
}

impl Default for NumberPlan {
    fn default() -> Self {
        Self {
            country_code: "7".to_string(),
            trunk_prefix: "8".to_string(),
            domestic_length: 10,
        }
    }
}

impl NumberPlan {
    /// Canonicalize `raw`. Returns an empty string when no digits remain.
    pub fn normalize(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return digits;
        }

        let trunk = self.trunk_prefix.as_str();
        if !trunk.is_empty()
            && digits.len() == self.domestic_length + trunk.len()
            && digits.starts_with(trunk)
        {
            return format!("{}{}", self.country_code, &digits[trunk.len()..]);
        }

        if digits.len() == self.domestic_length {
            return format!("{}{}", self.country_code, digits);
        }

        digits
    }
}

/// A canonical dialed number. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialedNumber(String);

impl DialedNumber {
    /// Normalize `raw` under `plan`; `None` means "no number".
    pub fn parse(raw: &str, plan: &NumberPlan) -> Option<Self> {
        let canonical = plan.normalize(raw);
        if canonical.is_empty() {
            None
        } else {
            Some(Self(canonical))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the address part of a `tel:` URI.
///
/// Returns the percent-decoded scheme-specific part up to the first `;`
/// parameter, or `None` if the URI is not a `tel:` URI.
pub fn tel_uri_address(uri: &str) -> Option<String> {
    let (scheme, rest) = uri.trim().split_once(':')?;
    if !scheme.eq_ignore_ascii_case("tel") {
        return None;
    }
    let address = rest.split(';').next().unwrap_or_default();
    let decoded = urlencoding::decode(address)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| address.to_string());
    Some(decoded)
}
