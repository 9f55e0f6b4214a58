//! Guarded status transitions with their side effects on the exception
//! record.

use crate::cache::CacheInvalidationService;
use crate::error::{CollectorError, Result};
use crate::logging::log_exception_operation;
use crate::models::InterfaceException;
use crate::state_machine::ExceptionStatus;
use crate::store::ExceptionStore;
use chrono::Utc;
use std::sync::Arc;

/// Applies status transitions validated against the transition table,
/// updating the timestamp and actor fields that accompany each target
/// state.
pub struct StatusTransitionService {
    store: Arc<dyn ExceptionStore>,
    invalidation: CacheInvalidationService,
}

impl StatusTransitionService {
    pub fn new(store: Arc<dyn ExceptionStore>, invalidation: CacheInvalidationService) -> Self {
        Self {
            store,
            invalidation,
        }
    }

    /// Move an exception to `target`, rejecting transitions the table does
    /// not allow.
    pub async fn update_status(
        &self,
        transaction_id: &str,
        target: ExceptionStatus,
        actor: &str,
    ) -> Result<InterfaceException> {
        let exception = self
            .store
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| CollectorError::not_found(transaction_id))?;

        if !exception.status.can_transition_to(target) {
            return Err(CollectorError::invalid_state(format!(
                "Invalid status transition from {} to {} for transaction: {}",
                exception.status, target, transaction_id
            )));
        }

        let updated = self.apply_transition(exception, target, actor);
        let saved = self.store.save(updated).await?;

        log_exception_operation(
            "STATUS_CHANGED",
            &saved.transaction_id,
            &saved.interface_type.to_string(),
            &saved.status.to_string(),
            Some(&format!("actor={actor}")),
        );
        self.invalidation.on_status_change(&saved);

        Ok(saved)
    }

    fn apply_transition(
        &self,
        mut exception: InterfaceException,
        target: ExceptionStatus,
        actor: &str,
    ) -> InterfaceException {
        let now = Utc::now();
        match target {
            ExceptionStatus::Acknowledged => {
                exception.acknowledged_at = Some(now);
                exception.acknowledged_by = Some(actor.to_string());
            }
            ExceptionStatus::RetriedSuccess | ExceptionStatus::Resolved => {
                exception.resolved_at = Some(now);
                exception.resolved_by = Some(actor.to_string());
            }
            ExceptionStatus::RetriedFailed => {
                exception.retry_count += 1;
                exception.last_retry_at = Some(now);
            }
            _ => {}
        }
        exception.status = target;
        exception
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExceptionCaches;
    use crate::models::InterfaceType;
    use crate::store::InMemoryExceptionStore;

    async fn service_with_exception(status: ExceptionStatus) -> (StatusTransitionService, String) {
        let store = Arc::new(InMemoryExceptionStore::new());
        let mut exception = InterfaceException::new(
            "TXN-SM",
            InterfaceType::Order,
            "Connection timeout",
            Utc::now(),
        );
        exception.status = status;
        store.save(exception).await.unwrap();

        let service = StatusTransitionService::new(
            store,
            CacheInvalidationService::new(Arc::new(ExceptionCaches::new())),
        );
        (service, "TXN-SM".to_string())
    }

    #[tokio::test]
    async fn test_acknowledge_sets_actor_fields() {
        let (service, id) = service_with_exception(ExceptionStatus::New).await;

        let updated = service
            .update_status(&id, ExceptionStatus::Acknowledged, "ops@example.com")
            .await
            .unwrap();

        assert_eq!(updated.status, ExceptionStatus::Acknowledged);
        assert!(updated.acknowledged_at.is_some());
        assert_eq!(updated.acknowledged_by.as_deref(), Some("ops@example.com"));
    }

    #[tokio::test]
    async fn test_retried_failed_bumps_retry_count() {
        let (service, id) = service_with_exception(ExceptionStatus::Acknowledged).await;

        let updated = service
            .update_status(&id, ExceptionStatus::RetriedFailed, "system")
            .await
            .unwrap();
        assert_eq!(updated.retry_count, 1);
        assert!(updated.last_retry_at.is_some());

        let updated = service
            .update_status(&id, ExceptionStatus::RetriedFailed, "system")
            .await
            .unwrap();
        assert_eq!(updated.retry_count, 2);
    }

    #[tokio::test]
    async fn test_retried_success_records_resolution() {
        let (service, id) = service_with_exception(ExceptionStatus::Acknowledged).await;

        let updated = service
            .update_status(&id, ExceptionStatus::RetriedSuccess, "system")
            .await
            .unwrap();
        assert!(updated.resolved_at.is_some());
        assert_eq!(updated.resolved_by.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected() {
        let (service, id) = service_with_exception(ExceptionStatus::New).await;

        let result = service
            .update_status(&id, ExceptionStatus::Closed, "ops")
            .await;
        assert!(matches!(result, Err(CollectorError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_closed_rejects_everything() {
        let (service, id) = service_with_exception(ExceptionStatus::Closed).await;

        for target in [
            ExceptionStatus::New,
            ExceptionStatus::Acknowledged,
            ExceptionStatus::Resolved,
        ] {
            let result = service.update_status(&id, target, "ops").await;
            assert!(matches!(result, Err(CollectorError::InvalidState(_))));
        }
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_not_found() {
        let (service, _) = service_with_exception(ExceptionStatus::New).await;
        let result = service
            .update_status("TXN-MISSING", ExceptionStatus::Acknowledged, "ops")
            .await;
        assert!(matches!(result, Err(CollectorError::NotFound { .. })));
    }
}
