use crate::state_machine::ExceptionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Upstream business interface that produced a failure event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterfaceType {
    Order,
    Collection,
    Distribution,
    /// Generic carrier used by validation-error events from test harnesses
    Test,
    /// Fallback for interface type strings this core does not recognize
    Unknown,
}

impl InterfaceType {
    /// Map an interface type string from an inbound event. Unrecognized
    /// strings are coarsely accepted rather than failing ingestion.
    pub fn from_event_str(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "ORDER"),
            Self::Collection => write!(f, "COLLECTION"),
            Self::Distribution => write!(f, "DISTRIBUTION"),
            Self::Test => write!(f, "TEST"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for InterfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER" => Ok(Self::Order),
            "COLLECTION" => Ok(Self::Collection),
            "DISTRIBUTION" => Ok(Self::Distribution),
            "TEST" => Ok(Self::Test),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("Invalid interface type: {s}")),
        }
    }
}

/// Failure category assigned during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionCategory {
    Validation,
    BusinessRule,
    NetworkError,
    Authorization,
    Authentication,
    SystemError,
    ExternalService,
}

impl fmt::Display for ExceptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::BusinessRule => write!(f, "BUSINESS_RULE"),
            Self::NetworkError => write!(f, "NETWORK_ERROR"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::SystemError => write!(f, "SYSTEM_ERROR"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
        }
    }
}

/// Severity assigned during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ExceptionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One persisted record per distinct failed business transaction.
///
/// `transaction_id` is the natural key: re-arrival of an event with the same
/// id mutates the existing record rather than creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceException {
    pub transaction_id: String,
    pub interface_type: InterfaceType,
    pub exception_reason: String,
    pub operation: Option<String>,
    pub external_id: Option<String>,
    pub customer_id: Option<String>,
    pub location_code: Option<String>,
    pub category: ExceptionCategory,
    pub severity: ExceptionSeverity,
    pub status: ExceptionStatus,
    pub retryable: bool,
    pub retry_count: u32,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub acknowledgment_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_method: Option<String>,
    pub resolution_notes: Option<String>,
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Whether best-effort context enrichment has been attempted
    pub context_retrieval_attempted: bool,
    /// Original upstream payload captured by context enrichment
    pub context_payload: Option<Value>,
    pub context_retrieved_at: Option<DateTime<Utc>>,
    pub context_retrieval_error: Option<String>,
}

impl InterfaceException {
    /// Create a new exception in its initial state. Classification fields
    /// default to the most common assignment and are overwritten by the
    /// classification engine before persistence.
    pub fn new(
        transaction_id: impl Into<String>,
        interface_type: InterfaceType,
        exception_reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            interface_type,
            exception_reason: exception_reason.into(),
            operation: None,
            external_id: None,
            customer_id: None,
            location_code: None,
            category: ExceptionCategory::BusinessRule,
            severity: ExceptionSeverity::Medium,
            status: ExceptionStatus::New,
            retryable: true,
            retry_count: 0,
            occurred_at,
            processed_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            acknowledgment_notes: None,
            resolved_at: None,
            resolved_by: None,
            resolution_method: None,
            resolution_notes: None,
            last_retry_at: None,
            context_retrieval_attempted: false,
            context_payload: None,
            context_retrieved_at: None,
            context_retrieval_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_exception_defaults() {
        let exception = InterfaceException::new(
            "TXN-1",
            InterfaceType::Order,
            "Order already exists",
            Utc::now(),
        );
        assert_eq!(exception.status, ExceptionStatus::New);
        assert_eq!(exception.retry_count, 0);
        assert!(!exception.context_retrieval_attempted);
        assert!(exception.acknowledged_at.is_none());
    }

    #[test]
    fn test_interface_type_from_event_str() {
        assert_eq!(InterfaceType::from_event_str("ORDER"), InterfaceType::Order);
        assert_eq!(
            InterfaceType::from_event_str("SOMETHING_ELSE"),
            InterfaceType::Unknown
        );
    }

    #[test]
    fn test_enum_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&ExceptionCategory::NetworkError).unwrap(),
            "\"NETWORK_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ExceptionSeverity::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::to_string(&InterfaceType::Distribution).unwrap(),
            "\"DISTRIBUTION\""
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ExceptionSeverity::Critical > ExceptionSeverity::High);
        assert!(ExceptionSeverity::High > ExceptionSeverity::Medium);
        assert!(ExceptionSeverity::Medium > ExceptionSeverity::Low);
    }
}
