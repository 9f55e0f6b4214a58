//! Scriptable in-process source service client for tests and local runs.

use crate::error::{CollectorError, Result};
use crate::gateway::{PayloadResponse, SourceServiceClient, SubmitResponse};
use crate::models::InterfaceException;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Behavior for the next calls to a [`MockSourceServiceClient`].
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Payload fetch and submit both succeed; submit returns this status.
    Succeed { submit_status: u16 },
    /// Payload fetch reports `retrieved: false` with this message.
    PayloadNotFound { error_message: String },
    /// Payload fetch succeeds, submit returns this non-2xx status and body.
    SubmitFail { status: u16, body: Value },
    /// Both operations fail with a transport-level error.
    TransportError { message: String },
}

impl Default for MockOutcome {
    fn default() -> Self {
        Self::Succeed { submit_status: 200 }
    }
}

/// Mock client with a configurable outcome, standing in for a real source
/// system during tests.
pub struct MockSourceServiceClient {
    source_service: String,
    outcome: Mutex<MockOutcome>,
    payload_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl MockSourceServiceClient {
    pub fn new(source_service: impl Into<String>) -> Self {
        Self {
            source_service: source_service.into(),
            outcome: Mutex::new(MockOutcome::default()),
            payload_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_outcome(source_service: impl Into<String>, outcome: MockOutcome) -> Self {
        let client = Self::new(source_service);
        client.set_outcome(outcome);
        client
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn payload_calls(&self) -> usize {
        self.payload_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    fn sample_payload(&self, exception: &InterfaceException) -> Value {
        json!({
            "externalId": exception.external_id,
            "transactionId": exception.transaction_id,
            "sourceService": self.source_service,
        })
    }
}

#[async_trait]
impl SourceServiceClient for MockSourceServiceClient {
    async fn get_original_payload(
        &self,
        exception: &InterfaceException,
    ) -> Result<PayloadResponse> {
        self.payload_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.lock().clone();
        match outcome {
            MockOutcome::Succeed { .. } | MockOutcome::SubmitFail { .. } => Ok(
                PayloadResponse::retrieved(self.sample_payload(exception), &self.source_service),
            ),
            MockOutcome::PayloadNotFound { error_message } => Ok(PayloadResponse::not_retrieved(
                &self.source_service,
                error_message,
            )),
            MockOutcome::TransportError { message } => {
                Err(CollectorError::ExternalService(message))
            }
        }
    }

    async fn submit_retry(
        &self,
        _exception: &InterfaceException,
        _payload: &Value,
    ) -> Result<SubmitResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.lock().clone();
        match outcome {
            MockOutcome::Succeed { submit_status } => Ok(SubmitResponse {
                status_code: submit_status,
                body: None,
            }),
            MockOutcome::SubmitFail { status, body } => Ok(SubmitResponse {
                status_code: status,
                body: Some(body),
            }),
            MockOutcome::PayloadNotFound { error_message } | MockOutcome::TransportError {
                message: error_message,
            } => Err(CollectorError::ExternalService(error_message)),
        }
    }

    fn source_service(&self) -> &str {
        &self.source_service
    }
}
