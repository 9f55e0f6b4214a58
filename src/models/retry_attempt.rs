use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a single retry execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryStatus {
    Pending,
    Success,
    Failed,
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One execution of the retry pipeline for an exception.
///
/// Attempt numbers are strictly increasing per exception, starting at 1.
/// At most one attempt per exception may be `Pending` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    pub id: Uuid,
    pub transaction_id: String,
    pub attempt_number: u32,
    pub status: RetryStatus,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_message: Option<String>,
    pub result_response_code: Option<u16>,
    pub result_error_details: Option<String>,
}

impl RetryAttempt {
    pub fn new(
        transaction_id: impl Into<String>,
        attempt_number: u32,
        initiated_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: transaction_id.into(),
            attempt_number,
            status: RetryStatus::Pending,
            initiated_by: initiated_by.into(),
            initiated_at: Utc::now(),
            completed_at: None,
            result_message: None,
            result_response_code: None,
            result_error_details: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RetryStatus::Pending
    }

    /// Mark the attempt as completed successfully.
    pub fn mark_success(&mut self, message: impl Into<String>, response_code: Option<u16>) {
        self.status = RetryStatus::Success;
        self.completed_at = Some(Utc::now());
        self.result_message = Some(message.into());
        self.result_response_code = response_code;
        self.result_error_details = None;
    }

    /// Mark the attempt as failed with diagnostic detail.
    pub fn mark_failed(
        &mut self,
        message: impl Into<String>,
        response_code: Option<u16>,
        error_details: impl Into<String>,
    ) {
        self.status = RetryStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.result_message = Some(message.into());
        self.result_response_code = response_code;
        self.result_error_details = Some(error_details.into());
    }
}
