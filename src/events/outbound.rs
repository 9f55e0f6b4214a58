use crate::alerting::CriticalAlert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound notifications emitted to the external publishing collaborator.
///
/// All notifications are best-effort: a publish failure is logged by the
/// emitting service and never rolls back the state change that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "notificationType")]
pub enum Notification {
    ExceptionResolved {
        transaction_id: String,
        resolved_by: String,
        resolution_method: String,
        resolution_notes: Option<String>,
        total_retry_attempts: u64,
        resolved_at: DateTime<Utc>,
    },
    RetryInitiated {
        transaction_id: String,
        attempt_number: u32,
        initiated_by: String,
        initiated_at: DateTime<Utc>,
    },
    RetryCompleted {
        transaction_id: String,
        attempt_number: u32,
        success: bool,
        result_message: Option<String>,
        initiated_by: String,
        completed_at: DateTime<Utc>,
    },
    CriticalAlert(CriticalAlert),
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExceptionResolved { .. } => "ExceptionResolved",
            Self::RetryInitiated { .. } => "RetryInitiated",
            Self::RetryCompleted { .. } => "RetryCompleted",
            Self::CriticalAlert(_) => "CriticalAlert",
        }
    }

    pub fn transaction_id(&self) -> &str {
        match self {
            Self::ExceptionResolved { transaction_id, .. }
            | Self::RetryInitiated { transaction_id, .. }
            | Self::RetryCompleted { transaction_id, .. } => transaction_id,
            Self::CriticalAlert(alert) => &alert.transaction_id,
        }
    }
}
