//! # Management Module
//!
//! Operator actions on exceptions: acknowledge and resolve.
//!
//! These are direct actions rather than table-guarded transitions; they are
//! valid from any state that is not already settled, including jumps the
//! transition table would reject (e.g. resolving a NEW exception that was
//! fixed out of band).

use crate::cache::CacheInvalidationService;
use crate::error::{CollectorError, Result};
use crate::events::{EventPublisher, Notification};
use crate::logging::log_exception_operation;
use crate::models::InterfaceException;
use crate::state_machine::ExceptionStatus;
use crate::store::{ExceptionStore, RetryAttemptStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Operator-facing lifecycle actions.
pub struct ExceptionManagementService {
    exception_store: Arc<dyn ExceptionStore>,
    attempt_store: Arc<dyn RetryAttemptStore>,
    publisher: EventPublisher,
    invalidation: CacheInvalidationService,
}

impl ExceptionManagementService {
    pub fn new(
        exception_store: Arc<dyn ExceptionStore>,
        attempt_store: Arc<dyn RetryAttemptStore>,
        publisher: EventPublisher,
        invalidation: CacheInvalidationService,
    ) -> Self {
        Self {
            exception_store,
            attempt_store,
            publisher,
            invalidation,
        }
    }

    /// Acknowledge an exception on behalf of an operator.
    pub async fn acknowledge(
        &self,
        transaction_id: &str,
        acknowledged_by: &str,
        notes: Option<String>,
    ) -> Result<InterfaceException> {
        let mut exception = self.load_unsettled(transaction_id).await?;

        exception.status = ExceptionStatus::Acknowledged;
        exception.acknowledged_at = Some(Utc::now());
        exception.acknowledged_by = Some(acknowledged_by.to_string());
        exception.acknowledgment_notes = notes;

        let saved = self.exception_store.save(exception).await?;
        log_exception_operation(
            "ACKNOWLEDGED",
            &saved.transaction_id,
            &saved.interface_type.to_string(),
            &saved.status.to_string(),
            Some(&format!("acknowledged_by={acknowledged_by}")),
        );
        self.invalidation.on_status_change(&saved);

        Ok(saved)
    }

    /// Resolve an exception with the given method and optional notes, and
    /// publish a resolution notification best-effort.
    pub async fn resolve(
        &self,
        transaction_id: &str,
        resolved_by: &str,
        resolution_method: &str,
        resolution_notes: Option<String>,
    ) -> Result<InterfaceException> {
        let mut exception = self.load_unsettled(transaction_id).await?;

        let now = Utc::now();
        exception.status = ExceptionStatus::Resolved;
        exception.resolved_at = Some(now);
        exception.resolved_by = Some(resolved_by.to_string());
        exception.resolution_method = Some(resolution_method.to_string());
        exception.resolution_notes = resolution_notes.clone();

        let saved = self.exception_store.save(exception).await?;
        log_exception_operation(
            "RESOLVED",
            &saved.transaction_id,
            &saved.interface_type.to_string(),
            &saved.status.to_string(),
            Some(&format!(
                "resolved_by={resolved_by} method={resolution_method}"
            )),
        );
        self.invalidation.on_status_change(&saved);

        let total_retry_attempts = self
            .attempt_store
            .statistics(transaction_id)
            .await
            .map(|s| s.total)
            .unwrap_or(0);
        if let Err(e) = self.publisher.publish(Notification::ExceptionResolved {
            transaction_id: transaction_id.to_string(),
            resolved_by: resolved_by.to_string(),
            resolution_method: resolution_method.to_string(),
            resolution_notes,
            total_retry_attempts,
            resolved_at: now,
        }) {
            warn!(
                transaction_id,
                error = %e,
                "Failed to publish resolution notification"
            );
        }

        Ok(saved)
    }

    pub async fn can_acknowledge(&self, transaction_id: &str) -> Result<bool> {
        self.is_unsettled(transaction_id).await
    }

    pub async fn can_resolve(&self, transaction_id: &str) -> Result<bool> {
        self.is_unsettled(transaction_id).await
    }

    /// Current status of an exception.
    pub async fn get_status(&self, transaction_id: &str) -> Result<ExceptionStatus> {
        let exception = self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| CollectorError::not_found(transaction_id))?;
        Ok(exception.status)
    }

    async fn load_unsettled(&self, transaction_id: &str) -> Result<InterfaceException> {
        let exception = self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| CollectorError::not_found(transaction_id))?;

        if exception.status.is_settled() {
            return Err(CollectorError::invalid_state(format!(
                "Exception is already {}: {transaction_id}",
                exception.status
            )));
        }
        Ok(exception)
    }

    async fn is_unsettled(&self, transaction_id: &str) -> Result<bool> {
        Ok(self
            .exception_store
            .find_by_transaction_id(transaction_id)
            .await?
            .is_some_and(|e| !e.status.is_settled()))
    }
}
