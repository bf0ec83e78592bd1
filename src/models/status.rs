use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single recognition decision.
///
/// Used both as the persisted event status and as the status returned to the
/// calling interface. Every variant is terminal for its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Unknown,
    Reject,
    Error,
    Duplicate,
    Cooldown,
    RejectOutTooEarly,
    RejectOutLate,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Ok,
        Status::Unknown,
        Status::Reject,
        Status::Error,
        Status::Duplicate,
        Status::Cooldown,
        Status::RejectOutTooEarly,
        Status::RejectOutLate,
    ];

    /// Statuses that count as a completed attempt by a recognized person when
    /// evaluating the cooldown. `cooldown` itself is excluded so that repeated
    /// retries do not keep extending the wait.
    pub const COOLDOWN_COUNTED: [Status; 4] = [
        Status::Ok,
        Status::Duplicate,
        Status::RejectOutTooEarly,
        Status::RejectOutLate,
    ];

    /// Statuses an administrator may re-attribute to another person.
    pub const CORRECTABLE: [Status; 4] = [
        Status::Ok,
        Status::Duplicate,
        Status::RejectOutTooEarly,
        Status::Cooldown,
    ];

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Unknown => "unknown",
            Status::Reject => "reject",
            Status::Error => "error",
            Status::Duplicate => "duplicate",
            Status::Cooldown => "cooldown",
            Status::RejectOutTooEarly => "reject_out_too_early",
            Status::RejectOutLate => "reject_out_late",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        Status::ALL.into_iter().find(|st| st.to_db_str() == s)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    pub fn is_correctable(&self) -> bool {
        Status::CORRECTABLE.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
