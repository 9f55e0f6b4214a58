//! In-memory store implementations used by tests and embedded deployments.

use crate::error::{CollectorError, Result};
use crate::models::{
    ExceptionSeverity, InterfaceException, InterfaceType, RetryAttempt,
};
use crate::store::{ExceptionStore, RetryAttemptStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Map-backed exception store keyed by transaction id.
#[derive(Debug, Default)]
pub struct InMemoryExceptionStore {
    exceptions: RwLock<HashMap<String, InterfaceException>>,
}

impl InMemoryExceptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exceptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exceptions.read().is_empty()
    }
}

#[async_trait]
impl ExceptionStore for InMemoryExceptionStore {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<InterfaceException>> {
        Ok(self.exceptions.read().get(transaction_id).cloned())
    }

    async fn save(&self, exception: InterfaceException) -> Result<InterfaceException> {
        self.exceptions
            .write()
            .insert(exception.transaction_id.clone(), exception.clone());
        Ok(exception)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .exceptions
            .read()
            .values()
            .filter(|e| e.processed_at >= since)
            .count() as u64)
    }

    async fn find_by_customer_since(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<InterfaceException>> {
        Ok(self
            .exceptions
            .read()
            .values()
            .filter(|e| e.customer_id.as_deref() == Some(customer_id) && e.processed_at >= since)
            .cloned()
            .collect())
    }

    async fn find_similar_since(
        &self,
        interface_type: InterfaceType,
        severity: ExceptionSeverity,
        since: DateTime<Utc>,
    ) -> Result<Vec<InterfaceException>> {
        Ok(self
            .exceptions
            .read()
            .values()
            .filter(|e| {
                e.interface_type == interface_type
                    && e.severity == severity
                    && e.processed_at >= since
            })
            .cloned()
            .collect())
    }
}

/// Map-backed retry attempt store keyed by transaction id.
///
/// Enforces the single-PENDING invariant at save time, the equivalent of a
/// partial unique index in a SQL-backed store. This closes the window left
/// by the orchestrator's check-then-act validation.
#[derive(Debug, Default)]
pub struct InMemoryRetryAttemptStore {
    attempts: RwLock<HashMap<String, Vec<RetryAttempt>>>,
}

impl InMemoryRetryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RetryAttemptStore for InMemoryRetryAttemptStore {
    async fn save(&self, attempt: RetryAttempt) -> Result<RetryAttempt> {
        let mut attempts = self.attempts.write();
        let entry = attempts
            .entry(attempt.transaction_id.clone())
            .or_default();

        if attempt.is_pending()
            && entry
                .iter()
                .any(|existing| existing.id != attempt.id && existing.is_pending())
        {
            return Err(CollectorError::invalid_state(format!(
                "A retry is already pending for transaction: {}",
                attempt.transaction_id
            )));
        }

        match entry.iter_mut().find(|existing| existing.id == attempt.id) {
            Some(existing) => *existing = attempt.clone(),
            None => {
                entry.push(attempt.clone());
                entry.sort_by_key(|a| a.attempt_number);
            }
        }

        Ok(attempt)
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Vec<RetryAttempt>> {
        Ok(self
            .attempts
            .read()
            .get(transaction_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_attempt(
        &self,
        transaction_id: &str,
        attempt_number: u32,
    ) -> Result<Option<RetryAttempt>> {
        Ok(self.attempts.read().get(transaction_id).and_then(|list| {
            list.iter()
                .find(|a| a.attempt_number == attempt_number)
                .cloned()
        }))
    }

    async fn latest_attempt(&self, transaction_id: &str) -> Result<Option<RetryAttempt>> {
        Ok(self
            .attempts
            .read()
            .get(transaction_id)
            .and_then(|list| list.last().cloned()))
    }

    async fn next_attempt_number(&self, transaction_id: &str) -> Result<u32> {
        Ok(self
            .attempts
            .read()
            .get(transaction_id)
            .and_then(|list| list.iter().map(|a| a.attempt_number).max())
            .unwrap_or(0)
            + 1)
    }
}
