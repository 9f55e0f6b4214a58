use crate::models::InterfaceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common envelope shared by all inbound failure events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<P> {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: String,
    pub occurred_on: DateTime<Utc>,
    pub source: String,
    pub correlation_id: Option<String>,
    pub payload: P,
}

impl<P> EventEnvelope<P> {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: P) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            event_version: "1.0".to_string(),
            occurred_on: Utc::now(),
            source: source.into(),
            correlation_id: None,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRejectedPayload {
    pub transaction_id: String,
    pub external_id: Option<String>,
    pub operation: Option<String>,
    pub rejected_reason: String,
    pub customer_id: Option<String>,
    pub location_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelledPayload {
    pub transaction_id: String,
    pub external_id: Option<String>,
    pub cancel_reason: String,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRejectedPayload {
    pub transaction_id: String,
    pub collection_id: Option<String>,
    pub operation: Option<String>,
    pub rejected_reason: String,
    /// Donor id doubles as the customer identifier for collection events
    pub donor_id: Option<String>,
    pub location_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionFailedPayload {
    pub transaction_id: String,
    pub distribution_id: Option<String>,
    pub operation: Option<String>,
    pub failure_reason: String,
    pub customer_id: Option<String>,
    pub destination_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFieldError {
    pub field: String,
    pub rejected_value: Option<String>,
    pub message: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorPayload {
    pub transaction_id: String,
    pub interface_type: String,
    pub validation_errors: Vec<ValidationFieldError>,
}

/// Inbound failure event, one variant per upstream interface contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum InboundEvent {
    OrderRejected(EventEnvelope<OrderRejectedPayload>),
    OrderCancelled(EventEnvelope<OrderCancelledPayload>),
    CollectionRejected(EventEnvelope<CollectionRejectedPayload>),
    DistributionFailed(EventEnvelope<DistributionFailedPayload>),
    ValidationError(EventEnvelope<ValidationErrorPayload>),
}

impl InboundEvent {
    pub fn transaction_id(&self) -> &str {
        match self {
            Self::OrderRejected(e) => &e.payload.transaction_id,
            Self::OrderCancelled(e) => &e.payload.transaction_id,
            Self::CollectionRejected(e) => &e.payload.transaction_id,
            Self::DistributionFailed(e) => &e.payload.transaction_id,
            Self::ValidationError(e) => &e.payload.transaction_id,
        }
    }

    pub fn interface_type(&self) -> InterfaceType {
        match self {
            Self::OrderRejected(_) | Self::OrderCancelled(_) => InterfaceType::Order,
            Self::CollectionRejected(_) => InterfaceType::Collection,
            Self::DistributionFailed(_) => InterfaceType::Distribution,
            Self::ValidationError(e) => InterfaceType::from_event_str(&e.payload.interface_type),
        }
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            Self::OrderRejected(e) => e.occurred_on,
            Self::OrderCancelled(e) => e.occurred_on,
            Self::CollectionRejected(e) => e.occurred_on,
            Self::DistributionFailed(e) => e.occurred_on,
            Self::ValidationError(e) => e.occurred_on,
        }
    }

    /// Human-readable failure reason. Validation errors aggregate all field
    /// failures into a single semicolon-joined string.
    pub fn reason(&self) -> String {
        match self {
            Self::OrderRejected(e) => e.payload.rejected_reason.clone(),
            Self::OrderCancelled(e) => e.payload.cancel_reason.clone(),
            Self::CollectionRejected(e) => e.payload.rejected_reason.clone(),
            Self::DistributionFailed(e) => e.payload.failure_reason.clone(),
            Self::ValidationError(e) => aggregate_validation_errors(&e.payload.validation_errors),
        }
    }
}

/// Join validation field errors into one exception reason string.
pub fn aggregate_validation_errors(errors: &[ValidationFieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("Field '{}': {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_aggregation() {
        let errors = vec![
            ValidationFieldError {
                field: "quantity".to_string(),
                rejected_value: Some("-1".to_string()),
                message: "must be positive".to_string(),
                error_code: Some("E100".to_string()),
            },
            ValidationFieldError {
                field: "customerId".to_string(),
                rejected_value: None,
                message: "is required".to_string(),
                error_code: None,
            },
        ];
        assert_eq!(
            aggregate_validation_errors(&errors),
            "Field 'quantity': must be positive; Field 'customerId': is required"
        );
    }

    #[test]
    fn test_interface_type_resolution() {
        let event = InboundEvent::ValidationError(EventEnvelope::new(
            "ValidationError",
            "order-service",
            ValidationErrorPayload {
                transaction_id: "TXN-V".to_string(),
                interface_type: "ORDER".to_string(),
                validation_errors: vec![],
            },
        ));
        assert_eq!(event.interface_type(), InterfaceType::Order);

        let event = InboundEvent::ValidationError(EventEnvelope::new(
            "ValidationError",
            "mystery-service",
            ValidationErrorPayload {
                transaction_id: "TXN-V".to_string(),
                interface_type: "NOT_AN_INTERFACE".to_string(),
                validation_errors: vec![],
            },
        ));
        assert_eq!(event.interface_type(), InterfaceType::Unknown);
    }
}
