//! # Retry Module
//!
//! Retry orchestration: attempt bookkeeping, the async resubmission
//! pipeline against source services, and cancellation.
//!
//! Initiation validates and records the attempt synchronously, then the
//! pipeline (payload fetch, resubmit, outcome classification) runs on a
//! spawned task. Finalization re-reads the attempt and skips any that is
//! no longer pending, so a cancellation that races the pipeline wins.

use crate::cache::CacheInvalidationService;
use crate::error::{CollectorError, Result};
use crate::events::{EventPublisher, Notification};
use crate::gateway::SourceServiceClientRegistry;
use crate::logging::{log_error, log_retry_operation};
use crate::models::{InterfaceException, RetryAttempt, RetryStatus};
use crate::resilience::ResilientClient;
use crate::state_machine::ExceptionStatus;
use crate::store::{ExceptionStore, RetryAttemptStore, RetryStatistics};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Synchronous acknowledgment returned by retry initiation while the
/// pipeline runs in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryResponse {
    pub retry_id: Uuid,
    pub transaction_id: String,
    pub status: RetryStatus,
    pub attempt_number: u32,
    pub estimated_completion: DateTime<Utc>,
    pub message: String,
}

/// Orchestrates retry attempts for exceptions.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct RetryService {
    exception_store: Arc<dyn ExceptionStore>,
    attempt_store: Arc<dyn RetryAttemptStore>,
    clients: Arc<SourceServiceClientRegistry>,
    resilient: Arc<ResilientClient>,
    publisher: EventPublisher,
    invalidation: CacheInvalidationService,
    retry_estimate: Duration,
}

impl RetryService {
    pub fn new(
        exception_store: Arc<dyn ExceptionStore>,
        attempt_store: Arc<dyn RetryAttemptStore>,
        clients: Arc<SourceServiceClientRegistry>,
        resilient: Arc<ResilientClient>,
        publisher: EventPublisher,
        invalidation: CacheInvalidationService,
        retry_estimate: std::time::Duration,
    ) -> Self {
        Self {
            exception_store,
            attempt_store,
            clients,
            resilient,
            publisher,
            invalidation,
            retry_estimate: Duration::seconds(retry_estimate.as_secs() as i64),
        }
    }

    /// Validate and record a retry attempt, then launch the resubmission
    /// pipeline in the background.
    pub async fn initiate_retry(
        &self,
        transaction_id: &str,
        initiated_by: &str,
        reason: Option<&str>,
    ) -> Result<RetryResponse> {
        let mut exception = self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| CollectorError::not_found(transaction_id))?;

        if !exception.retryable {
            return Err(CollectorError::invalid_state(format!(
                "Exception is not retryable: {transaction_id}"
            )));
        }
        if exception.status.is_settled() {
            return Err(CollectorError::invalid_state(format!(
                "Exception is already {}: {transaction_id}",
                exception.status
            )));
        }
        if let Some(latest) = self.attempt_store.latest_attempt(transaction_id).await? {
            if latest.is_pending() {
                return Err(CollectorError::invalid_state(format!(
                    "A retry is already pending for transaction: {transaction_id}"
                )));
            }
        }

        let attempt_number = self.attempt_store.next_attempt_number(transaction_id).await?;
        let attempt = self
            .attempt_store
            .save(RetryAttempt::new(transaction_id, attempt_number, initiated_by))
            .await?;

        exception.retry_count += 1;
        exception.last_retry_at = Some(attempt.initiated_at);
        let exception = self.exception_store.save(exception).await?;

        let details = match reason {
            Some(reason) => format!("initiated_by={initiated_by} reason={reason}"),
            None => format!("initiated_by={initiated_by}"),
        };
        log_retry_operation(
            "INITIATED",
            transaction_id,
            Some(attempt_number),
            &RetryStatus::Pending.to_string(),
            Some(&details),
        );
        if let Err(e) = self.publisher.publish(Notification::RetryInitiated {
            transaction_id: transaction_id.to_string(),
            attempt_number,
            initiated_by: initiated_by.to_string(),
            initiated_at: attempt.initiated_at,
        }) {
            warn!(transaction_id, error = %e, "Failed to publish retry-initiated notification");
        }
        self.invalidation.on_retry_activity(&exception);

        let service = self.clone();
        let pipeline_exception = exception.clone();
        let pipeline_attempt = attempt.clone();
        tokio::spawn(async move {
            service
                .execute_pipeline(pipeline_exception, pipeline_attempt)
                .await;
        });

        Ok(RetryResponse {
            retry_id: attempt.id,
            transaction_id: transaction_id.to_string(),
            status: RetryStatus::Pending,
            attempt_number,
            estimated_completion: attempt.initiated_at + self.retry_estimate,
            message: format!("Retry attempt {attempt_number} initiated"),
        })
    }

    /// Whether a retry could be initiated right now.
    pub async fn can_retry(&self, transaction_id: &str) -> Result<bool> {
        let Some(exception) = self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
        else {
            return Ok(false);
        };
        if !exception.retryable || exception.status.is_settled() {
            return Ok(false);
        }
        let pending = self
            .attempt_store
            .latest_attempt(transaction_id)
            .await?
            .is_some_and(|a| a.is_pending());
        Ok(!pending)
    }

    /// Cancel a pending attempt. The pipeline may still be in flight;
    /// finalization will observe the cancelled status and stand down.
    pub async fn cancel_retry(
        &self,
        transaction_id: &str,
        attempt_number: u32,
    ) -> Result<RetryAttempt> {
        let mut attempt = self
            .attempt_store
            .find_attempt(transaction_id, attempt_number)
            .await?
            .ok_or_else(|| CollectorError::not_found(transaction_id))?;

        if !attempt.is_pending() {
            return Err(CollectorError::invalid_state(format!(
                "Retry attempt {attempt_number} is not pending for transaction: {transaction_id}"
            )));
        }

        attempt.mark_failed(
            "Retry cancelled by user",
            None,
            "User cancelled retry operation",
        );
        let attempt = self.attempt_store.save(attempt).await?;

        log_retry_operation(
            "CANCELLED",
            transaction_id,
            Some(attempt_number),
            &attempt.status.to_string(),
            None,
        );
        if let Some(exception) = self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
        {
            self.invalidation.on_retry_activity(&exception);
        }

        Ok(attempt)
    }

    /// All attempts for an exception, ordered by attempt number.
    pub async fn get_retry_history(&self, transaction_id: &str) -> Result<Vec<RetryAttempt>> {
        self.attempt_store.find_by_transaction_id(transaction_id).await
    }

    pub async fn get_latest_attempt(&self, transaction_id: &str) -> Result<Option<RetryAttempt>> {
        self.attempt_store.latest_attempt(transaction_id).await
    }

    pub async fn get_statistics(&self, transaction_id: &str) -> Result<RetryStatistics> {
        self.attempt_store.statistics(transaction_id).await
    }

    /// The background half of a retry: fetch the original payload, resubmit
    /// it, and classify the outcome. Never propagates errors; every exit
    /// path finalizes the attempt.
    async fn execute_pipeline(&self, exception: InterfaceException, attempt: RetryAttempt) {
        let Some(client) = self.clients.get(exception.interface_type) else {
            self.finalize_failure(
                &attempt,
                format!(
                    "No source service client registered for interface type: {}",
                    exception.interface_type
                ),
                None,
                "Client registry lookup failed".to_string(),
            )
            .await;
            return;
        };

        let payload_response = match self
            .resilient
            .execute(|| client.get_original_payload(&exception))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.finalize_failure(
                    &attempt,
                    "Failed to retrieve original payload".to_string(),
                    None,
                    e.to_string(),
                )
                .await;
                return;
            }
        };

        if !payload_response.retrieved {
            self.finalize_failure(
                &attempt,
                "Original payload not available".to_string(),
                None,
                payload_response
                    .error_message
                    .unwrap_or_else(|| "Payload not available".to_string()),
            )
            .await;
            return;
        }

        let payload = payload_response
            .payload
            .unwrap_or(serde_json::Value::Null);

        let submit_response = match self
            .resilient
            .execute(|| client.submit_retry(&exception, &payload))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.finalize_failure(
                    &attempt,
                    "Retry submission failed".to_string(),
                    None,
                    e.to_string(),
                )
                .await;
                return;
            }
        };

        if submit_response.is_success() {
            self.finalize_success(
                &attempt,
                format!(
                    "Retry completed successfully with status: {}",
                    submit_response.status_code
                ),
                submit_response.status_code,
            )
            .await;
        } else {
            self.finalize_failure(
                &attempt,
                format!("Retry failed with status: {}", submit_response.status_code),
                Some(submit_response.status_code),
                submit_response.body_text(),
            )
            .await;
        }
    }

    async fn finalize_success(&self, attempt: &RetryAttempt, message: String, status_code: u16) {
        let Some(mut current) = self.reload_pending(attempt).await else {
            return;
        };
        current.mark_success(&message, Some(status_code));
        if let Err(e) = self.attempt_store.save(current.clone()).await {
            log_error(
                "retry",
                "finalize_success",
                &e.to_string(),
                Some(&attempt.transaction_id),
            );
            return;
        }

        match self
            .exception_store
            .find_by_transaction_id(&attempt.transaction_id)
            .await
        {
            Ok(Some(mut exception)) => {
                exception.status = ExceptionStatus::RetriedSuccess;
                exception.resolved_at = current.completed_at;
                exception.resolved_by = Some(current.initiated_by.clone());
                match self.exception_store.save(exception).await {
                    Ok(saved) => self.invalidation.on_retry_activity(&saved),
                    Err(e) => log_error(
                        "retry",
                        "finalize_success",
                        &e.to_string(),
                        Some(&attempt.transaction_id),
                    ),
                }
            }
            Ok(None) => {}
            Err(e) => log_error(
                "retry",
                "finalize_success",
                &e.to_string(),
                Some(&attempt.transaction_id),
            ),
        }

        info!(
            transaction_id = %attempt.transaction_id,
            attempt_number = attempt.attempt_number,
            status_code,
            "Retry attempt succeeded"
        );
        log_retry_operation(
            "COMPLETED",
            &attempt.transaction_id,
            Some(attempt.attempt_number),
            &RetryStatus::Success.to_string(),
            Some(&message),
        );
        self.publish_completed(&current, true);
    }

    async fn finalize_failure(
        &self,
        attempt: &RetryAttempt,
        message: String,
        status_code: Option<u16>,
        error_details: String,
    ) {
        let Some(mut current) = self.reload_pending(attempt).await else {
            return;
        };
        current.mark_failed(&message, status_code, &error_details);
        if let Err(e) = self.attempt_store.save(current.clone()).await {
            log_error(
                "retry",
                "finalize_failure",
                &e.to_string(),
                Some(&attempt.transaction_id),
            );
            return;
        }

        match self
            .exception_store
            .find_by_transaction_id(&attempt.transaction_id)
            .await
        {
            Ok(Some(mut exception)) => {
                // last_retry_at was already stamped at initiation
                exception.status = ExceptionStatus::RetriedFailed;
                match self.exception_store.save(exception).await {
                    Ok(saved) => self.invalidation.on_retry_activity(&saved),
                    Err(e) => log_error(
                        "retry",
                        "finalize_failure",
                        &e.to_string(),
                        Some(&attempt.transaction_id),
                    ),
                }
            }
            Ok(None) => {}
            Err(e) => log_error(
                "retry",
                "finalize_failure",
                &e.to_string(),
                Some(&attempt.transaction_id),
            ),
        }

        warn!(
            transaction_id = %attempt.transaction_id,
            attempt_number = attempt.attempt_number,
            error = %error_details,
            "Retry attempt failed"
        );
        log_retry_operation(
            "COMPLETED",
            &attempt.transaction_id,
            Some(attempt.attempt_number),
            &RetryStatus::Failed.to_string(),
            Some(&message),
        );
        self.publish_completed(&current, false);
    }

    /// Re-read the attempt before finalizing. Returns `None` when the
    /// attempt is gone or no longer pending (cancelled while in flight).
    async fn reload_pending(&self, attempt: &RetryAttempt) -> Option<RetryAttempt> {
        match self
            .attempt_store
            .find_attempt(&attempt.transaction_id, attempt.attempt_number)
            .await
        {
            Ok(Some(current)) if current.is_pending() => Some(current),
            Ok(_) => {
                info!(
                    transaction_id = %attempt.transaction_id,
                    attempt_number = attempt.attempt_number,
                    "Attempt no longer pending, skipping finalization"
                );
                None
            }
            Err(e) => {
                log_error(
                    "retry",
                    "reload_pending",
                    &e.to_string(),
                    Some(&attempt.transaction_id),
                );
                None
            }
        }
    }

    fn publish_completed(&self, attempt: &RetryAttempt, success: bool) {
        let notification = Notification::RetryCompleted {
            transaction_id: attempt.transaction_id.clone(),
            attempt_number: attempt.attempt_number,
            success,
            result_message: attempt.result_message.clone(),
            initiated_by: attempt.initiated_by.clone(),
            completed_at: attempt.completed_at.unwrap_or_else(Utc::now),
        };
        if let Err(e) = self.publisher.publish(notification) {
            warn!(
                transaction_id = %attempt.transaction_id,
                error = %e,
                "Failed to publish retry-completed notification"
            );
        }
    }
}
