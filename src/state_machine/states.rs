use serde::{Deserialize, Serialize};
use std::fmt;

/// Exception lifecycle states.
///
/// An exception starts in `New` and moves through acknowledgment, retry
/// outcomes, escalation, and resolution. `Closed` is terminal: no outgoing
/// transitions exist and any attempted transition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionStatus {
    /// Initial state when the exception is first recorded
    New,
    /// An operator has acknowledged the exception
    Acknowledged,
    /// The most recent retry attempt failed
    RetriedFailed,
    /// A retry attempt succeeded
    RetriedSuccess,
    /// The exception has been escalated
    Escalated,
    /// The exception has been resolved
    Resolved,
    /// The exception is closed (terminal)
    Closed,
}

impl ExceptionStatus {
    /// All states this status may legally transition to.
    pub fn allowed_transitions(&self) -> &'static [ExceptionStatus] {
        match self {
            Self::New => &[Self::Acknowledged, Self::Escalated],
            Self::Acknowledged => &[
                Self::RetriedSuccess,
                Self::RetriedFailed,
                Self::Resolved,
                Self::Escalated,
            ],
            Self::RetriedFailed => &[
                Self::RetriedSuccess,
                Self::RetriedFailed,
                Self::Escalated,
                Self::Resolved,
            ],
            Self::RetriedSuccess => &[Self::Resolved, Self::Closed],
            Self::Escalated => &[Self::Resolved, Self::Closed],
            Self::Resolved => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    /// Check whether a transition to `target` is allowed from this state.
    pub fn can_transition_to(&self, target: ExceptionStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// States in which operator acknowledge/resolve actions are rejected
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Acknowledged => write!(f, "ACKNOWLEDGED"),
            Self::RetriedFailed => write!(f, "RETRIED_FAILED"),
            Self::RetriedSuccess => write!(f, "RETRIED_SUCCESS"),
            Self::Escalated => write!(f, "ESCALATED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

impl std::str::FromStr for ExceptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ACKNOWLEDGED" => Ok(Self::Acknowledged),
            "RETRIED_FAILED" => Ok(Self::RetriedFailed),
            "RETRIED_SUCCESS" => Ok(Self::RetriedSuccess),
            "ESCALATED" => Ok(Self::Escalated),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(format!("Invalid exception status: {s}")),
        }
    }
}

impl Default for ExceptionStatus {
    fn default() -> Self {
        Self::New
    }
}
