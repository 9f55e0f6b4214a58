//! End-to-end retry pipeline tests: initiation through the gateway to
//! outcome classification and notifications.

use exception_collector_core::cache::{CacheInvalidationService, ExceptionCaches};
use exception_collector_core::events::EventPublisher;
use exception_collector_core::gateway::mock::{MockOutcome, MockSourceServiceClient};
use exception_collector_core::gateway::SourceServiceClientRegistry;
use exception_collector_core::models::{InterfaceException, RetryAttempt};
use exception_collector_core::resilience::{
    CircuitBreakerConfig, ResilientClient, RetryPolicyConfig,
};
use exception_collector_core::retry::RetryService;
use exception_collector_core::store::{
    ExceptionStore, InMemoryExceptionStore, InMemoryRetryAttemptStore, RetryAttemptStore,
};
use exception_collector_core::{
    CollectorError, ExceptionStatus, InterfaceType, RetryStatus,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: RetryService,
    exceptions: Arc<InMemoryExceptionStore>,
    attempts: Arc<InMemoryRetryAttemptStore>,
    clients: Arc<SourceServiceClientRegistry>,
    publisher: EventPublisher,
}

fn harness() -> Harness {
    let exceptions = Arc::new(InMemoryExceptionStore::new());
    let attempts = Arc::new(InMemoryRetryAttemptStore::new());
    let clients = Arc::new(SourceServiceClientRegistry::new());
    let publisher = EventPublisher::new(64);
    let resilient = Arc::new(ResilientClient::new(
        "source-gateway",
        CircuitBreakerConfig {
            failure_threshold: 100,
            ..Default::default()
        },
        RetryPolicyConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            call_timeout: Duration::from_millis(500),
        },
    ));
    let service = RetryService::new(
        exceptions.clone(),
        attempts.clone(),
        clients.clone(),
        resilient,
        publisher.clone(),
        CacheInvalidationService::new(Arc::new(ExceptionCaches::new())),
        Duration::from_secs(300),
    );
    Harness {
        service,
        exceptions,
        attempts,
        clients,
        publisher,
    }
}

async fn seed_retryable(h: &Harness, transaction_id: &str) {
    let mut exception = InterfaceException::new(
        transaction_id,
        InterfaceType::Order,
        "Connection timeout",
        Utc::now(),
    );
    exception.external_id = Some("ORD-42".to_string());
    h.exceptions.save(exception).await.unwrap();
}

async fn wait_for_completion(h: &Harness, transaction_id: &str) -> RetryAttempt {
    for _ in 0..200 {
        if let Some(attempt) = h.attempts.latest_attempt(transaction_id).await.unwrap() {
            if !attempt.is_pending() {
                return attempt;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("retry pipeline did not complete for {transaction_id}");
}

#[tokio::test]
async fn successful_retry_emits_lifecycle_notifications() {
    let h = harness();
    seed_retryable(&h, "TXN-P1").await;
    h.clients.register(
        InterfaceType::Order,
        Arc::new(MockSourceServiceClient::new("partner-order-service")),
    );
    let mut rx = h.publisher.subscribe();

    let response = h.service.initiate_retry("TXN-P1", "operator", None).await.unwrap();
    assert_eq!(response.status, RetryStatus::Pending);
    assert!(response.estimated_completion > Utc::now());

    let attempt = wait_for_completion(&h, "TXN-P1").await;
    assert_eq!(attempt.status, RetryStatus::Success);

    let initiated = rx.recv().await.unwrap();
    assert_eq!(initiated.notification.name(), "RetryInitiated");
    let completed = rx.recv().await.unwrap();
    assert_eq!(completed.notification.name(), "RetryCompleted");

    let exception = h
        .exceptions
        .find_by_transaction_id("TXN-P1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exception.status, ExceptionStatus::RetriedSuccess);
    assert!(exception.resolved_at.is_some());
}

#[tokio::test]
async fn transport_errors_exhaust_bounded_attempts() {
    let h = harness();
    seed_retryable(&h, "TXN-P2").await;
    let client = Arc::new(MockSourceServiceClient::with_outcome(
        "partner-order-service",
        MockOutcome::TransportError {
            message: "connection refused".to_string(),
        },
    ));
    h.clients.register(InterfaceType::Order, client.clone());

    h.service.initiate_retry("TXN-P2", "operator", None).await.unwrap();
    let attempt = wait_for_completion(&h, "TXN-P2").await;
    assert_eq!(attempt.status, RetryStatus::Failed);
    // The resilience layer retried the payload fetch before giving up
    assert_eq!(client.payload_calls(), 2);
    assert_eq!(client.submit_calls(), 0);

    let exception = h
        .exceptions
        .find_by_transaction_id("TXN-P2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exception.status, ExceptionStatus::RetriedFailed);
    // last_retry_at reflects initiation, not attempt completion
    assert_eq!(exception.last_retry_at, Some(attempt.initiated_at));
    assert!(attempt.completed_at.unwrap() > attempt.initiated_at);
}

#[tokio::test]
async fn retry_after_failure_gets_next_attempt_number() {
    let h = harness();
    seed_retryable(&h, "TXN-P3").await;
    let client = Arc::new(MockSourceServiceClient::with_outcome(
        "partner-order-service",
        MockOutcome::SubmitFail {
            status: 502,
            body: serde_json::json!({"error": "bad gateway"}),
        },
    ));
    h.clients.register(InterfaceType::Order, client.clone());

    h.service.initiate_retry("TXN-P3", "operator", None).await.unwrap();
    wait_for_completion(&h, "TXN-P3").await;

    // Upstream recovers; second attempt succeeds
    client.set_outcome(MockOutcome::Succeed { submit_status: 200 });
    let second = h.service.initiate_retry("TXN-P3", "operator", None).await.unwrap();
    assert_eq!(second.attempt_number, 2);
    let attempt = wait_for_completion(&h, "TXN-P3").await;
    assert_eq!(attempt.status, RetryStatus::Success);

    let stats = h.service.get_statistics("TXN-P3").await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.successful, 1);

    let exception = h
        .exceptions
        .find_by_transaction_id("TXN-P3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exception.retry_count, 2);
    assert_eq!(exception.status, ExceptionStatus::RetriedSuccess);
}

#[tokio::test]
async fn settled_exception_cannot_be_retried() {
    let h = harness();
    let mut exception = InterfaceException::new(
        "TXN-P4",
        InterfaceType::Order,
        "Connection timeout",
        Utc::now(),
    );
    exception.status = ExceptionStatus::Resolved;
    h.exceptions.save(exception).await.unwrap();

    let result = h.service.initiate_retry("TXN-P4", "operator", None).await;
    assert!(matches!(result, Err(CollectorError::InvalidState(_))));
    assert!(!h.service.can_retry("TXN-P4").await.unwrap());
}

#[tokio::test]
async fn cancelled_attempt_is_recorded_as_failed() {
    let h = harness();
    seed_retryable(&h, "TXN-P5").await;
    h.attempts
        .save(RetryAttempt::new("TXN-P5", 1, "operator"))
        .await
        .unwrap();

    let cancelled = h.service.cancel_retry("TXN-P5", 1).await.unwrap();
    assert_eq!(cancelled.status, RetryStatus::Failed);

    // The slot is free again for a fresh attempt
    assert!(h.service.can_retry("TXN-P5").await.unwrap());
    let next = h.service.initiate_retry("TXN-P5", "operator", None).await.unwrap();
    assert_eq!(next.attempt_number, 2);
}
