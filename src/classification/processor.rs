//! Inbound event processing: classification, deduplication, best-effort
//! context enrichment, persistence, and alert evaluation.

use crate::alerting::AlertingService;
use crate::cache::CacheInvalidationService;
use crate::classification::rules;
use crate::error::Result;
use crate::events::InboundEvent;
use crate::gateway::SourceServiceClientRegistry;
use crate::logging::log_exception_operation;
use crate::models::{
    ExceptionCategory, ExceptionSeverity, InterfaceException, InterfaceType,
};
use crate::store::ExceptionStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns inbound failure events into persisted, classified exceptions.
///
/// Processing is idempotent on `transaction_id`: re-arrival of an event for
/// a known transaction updates the existing record instead of creating a
/// second one.
pub struct ExceptionProcessingService {
    store: Arc<dyn ExceptionStore>,
    clients: Arc<SourceServiceClientRegistry>,
    alerting: Arc<AlertingService>,
    invalidation: CacheInvalidationService,
    enrichment_timeout: Duration,
}

impl ExceptionProcessingService {
    pub fn new(
        store: Arc<dyn ExceptionStore>,
        clients: Arc<SourceServiceClientRegistry>,
        alerting: Arc<AlertingService>,
        invalidation: CacheInvalidationService,
        enrichment_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clients,
            alerting,
            invalidation,
            enrichment_timeout,
        }
    }

    /// Process one inbound failure event end to end: classify, dedup,
    /// enrich (rejected-order events only), persist, evaluate alerts, and apply
    /// cache invalidation.
    pub async fn process_event(&self, event: &InboundEvent) -> Result<InterfaceException> {
        let transaction_id = event.transaction_id().to_string();
        let interface_type = event.interface_type();
        let reason = event.reason();

        let existing = self.store.find_by_transaction_id(&transaction_id).await?;
        let is_new = existing.is_none();

        let mut exception = match existing {
            Some(mut current) => {
                // Duplicate arrival: refresh the reason and processing time
                // but leave status, audit fields, and classification alone.
                debug!(
                    transaction_id = %transaction_id,
                    "Duplicate event for known transaction, updating existing exception"
                );
                current.exception_reason = reason.clone();
                current.processed_at = Utc::now();
                current
            }
            None => {
                let mut fresh = InterfaceException::new(
                    transaction_id.clone(),
                    interface_type,
                    reason.clone(),
                    event.occurred_on(),
                );
                apply_event_metadata(&mut fresh, event);
                let (category, severity, retryable) = classify(event, interface_type, &reason);
                fresh.category = category;
                fresh.severity = severity;
                fresh.retryable = retryable;
                fresh
            }
        };

        // Only rejected orders carry a resubmittable upstream record;
        // cancellations and validation events are never enriched.
        if matches!(event, InboundEvent::OrderRejected(_)) && !exception.context_retrieval_attempted
        {
            self.enrich_with_context(&mut exception).await;
        }

        let saved = self.store.save(exception).await?;

        log_exception_operation(
            if is_new { "CREATED" } else { "UPDATED" },
            &saved.transaction_id,
            &saved.interface_type.to_string(),
            &saved.status.to_string(),
            Some(&format!(
                "severity={} category={} retryable={}",
                saved.severity, saved.category, saved.retryable
            )),
        );

        self.alerting.evaluate_and_alert(&saved).await;
        self.invalidation.on_exception_created(&saved);

        Ok(saved)
    }

    /// Best-effort retrieval of the original upstream payload, bounded by
    /// the enrichment timeout. A fetched payload makes the exception
    /// retryable: there is something to resubmit. Failures are absorbed
    /// into the exception record and force it non-retryable.
    async fn enrich_with_context(&self, exception: &mut InterfaceException) {
        exception.context_retrieval_attempted = true;

        let Some(client) = self.clients.get(exception.interface_type) else {
            warn!(
                transaction_id = %exception.transaction_id,
                interface_type = %exception.interface_type,
                "No source service client registered, skipping context enrichment"
            );
            exception.context_retrieval_error =
                Some("No source service client registered".to_string());
            exception.retryable = false;
            return;
        };

        let outcome =
            tokio::time::timeout(self.enrichment_timeout, client.get_original_payload(exception))
                .await;

        match outcome {
            Ok(Ok(response)) if response.retrieved => {
                info!(
                    transaction_id = %exception.transaction_id,
                    source_service = response.source_service.as_deref(),
                    "Retrieved original payload for context enrichment"
                );
                exception.context_payload = response.payload;
                exception.context_retrieved_at = Some(Utc::now());
                exception.retryable = true;
            }
            Ok(Ok(response)) => {
                let message = response
                    .error_message
                    .unwrap_or_else(|| "Payload not available".to_string());
                warn!(
                    transaction_id = %exception.transaction_id,
                    error = %message,
                    "Context enrichment returned no payload"
                );
                exception.context_retrieval_error = Some(message);
                exception.retryable = false;
            }
            Ok(Err(e)) => {
                warn!(
                    transaction_id = %exception.transaction_id,
                    error = %e,
                    "Context enrichment call failed"
                );
                exception.context_retrieval_error = Some(e.to_string());
                exception.retryable = false;
            }
            Err(_) => {
                warn!(
                    transaction_id = %exception.transaction_id,
                    timeout_ms = self.enrichment_timeout.as_millis() as u64,
                    "Context enrichment timed out"
                );
                exception.context_retrieval_error = Some(format!(
                    "Context retrieval timed out after {}ms",
                    self.enrichment_timeout.as_millis()
                ));
                exception.retryable = false;
            }
        }
    }
}

/// Copy variant-specific metadata from the event payload onto a new
/// exception record.
fn apply_event_metadata(exception: &mut InterfaceException, event: &InboundEvent) {
    match event {
        InboundEvent::OrderRejected(e) => {
            exception.external_id = e.payload.external_id.clone();
            exception.operation = e.payload.operation.clone();
            exception.customer_id = e.payload.customer_id.clone();
            exception.location_code = e.payload.location_code.clone();
        }
        InboundEvent::OrderCancelled(e) => {
            exception.external_id = e.payload.external_id.clone();
            exception.operation = Some("CANCEL_ORDER".to_string());
            exception.customer_id = e.payload.customer_id.clone();
        }
        InboundEvent::CollectionRejected(e) => {
            exception.external_id = e.payload.collection_id.clone();
            exception.operation = e.payload.operation.clone();
            exception.customer_id = e.payload.donor_id.clone();
            exception.location_code = e.payload.location_code.clone();
        }
        InboundEvent::DistributionFailed(e) => {
            exception.external_id = e.payload.distribution_id.clone();
            exception.operation = e.payload.operation.clone();
            exception.customer_id = e.payload.customer_id.clone();
            exception.location_code = e.payload.destination_location.clone();
        }
        InboundEvent::ValidationError(_) => {}
    }
}

/// Classification dispatch. Validation events carry a fixed classification;
/// everything else goes through the keyword rule tables.
fn classify(
    event: &InboundEvent,
    interface_type: InterfaceType,
    reason: &str,
) -> (ExceptionCategory, ExceptionSeverity, bool) {
    if matches!(event, InboundEvent::ValidationError(_)) {
        return (
            ExceptionCategory::Validation,
            ExceptionSeverity::Medium,
            true,
        );
    }
    (
        rules::classify_category(interface_type, reason),
        rules::classify_severity(interface_type, reason),
        rules::classify_retryable(reason),
    )
}
