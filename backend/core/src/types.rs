use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a call attempt concluded, as far as the engine can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Connected,
    Forwarded,
    Busy,
    EndedUnanswered,
    Unknown,
}

impl CallOutcome {
    /// Outcomes that may lead to a redirect.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Forwarded | Self::Busy | Self::EndedUnanswered)
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Forwarded => "forwarded",
            Self::Busy => "busy",
            Self::EndedUnanswered => "ended_unanswered",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for CallOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connected" => Ok(Self::Connected),
            "forwarded" => Ok(Self::Forwarded),
            "busy" => Ok(Self::Busy),
            "ended_unanswered" | "ended" | "unanswered" => Ok(Self::EndedUnanswered),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown call outcome '{other}'")),
        }
    }
}

/// What the engine must do before handing off to the messaging application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPolicy {
    /// Tear down the GSM leg before dispatching.
    pub requires_termination: bool,
}

/// Which classifier path produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Structured,
    CallState,
    Exact,
    Fuzzy,
}

/// Classifier output for one outcome signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub outcome: CallOutcome,
    pub policy: ActionPolicy,
    pub matched_by: MatchKind,
}

impl Verdict {
    pub fn new(outcome: CallOutcome, requires_termination: bool, matched_by: MatchKind) -> Self {
        Self {
            outcome,
            policy: ActionPolicy { requires_termination },
            matched_by,
        }
    }

    /// True if this verdict may move a dialed attempt into termination.
    pub fn qualifies(&self) -> bool {
        self.outcome.is_failure()
    }
}

/// Telephony line state as reported by the call collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineState {
    Idle,
    Ringing,
    /// The remote party picked up.
    Offhook,
}

/// Structured disconnect reason reported when a call leg ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisconnectCode {
    Busy,
    Congestion,
    NoAnswer,
    Local,
    Remote,
    Rejected,
    Error,
    Unknown,
    Other,
}

impl DisconnectCode {
    /// Map an `android.telecom.DisconnectCause` integer code.
    pub fn from_telecom_code(code: i32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Error,
            2 => Self::Local,
            3 => Self::Remote,
            5 => Self::NoAnswer,
            6 => Self::Rejected,
            7 => Self::Busy,
            _ => Self::Other,
        }
    }
}

impl FromStr for DisconnectCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let code = match upper.as_str() {
            "BUSY" => Self::Busy,
            "CONGESTION" => Self::Congestion,
            "NO_ANSWER" | "MISSED" => Self::NoAnswer,
            "LOCAL" => Self::Local,
            "REMOTE" => Self::Remote,
            "REJECTED" => Self::Rejected,
            "ERROR" => Self::Error,
            "UNKNOWN" => Self::Unknown,
            "OTHER" | "CANCELED" | "RESTRICTED" => Self::Other,
            other => match other.parse::<i32>() {
                Ok(n) => Self::from_telecom_code(n),
                Err(_) => return Err(format!("unknown disconnect code '{s}'")),
            },
        };
        Ok(code)
    }
}
