//! Collaborator contracts for durable storage of exceptions and retry
//! attempts, plus in-memory reference implementations.
//!
//! The persistence engine itself is external to this core; these traits are
//! the narrow contract it must satisfy. The in-memory stores back the test
//! suite and embedded/demo use.

pub mod memory;

use crate::error::Result;
use crate::models::{
    ExceptionSeverity, InterfaceException, InterfaceType, RetryAttempt, RetryStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable keyed storage for exceptions.
#[async_trait]
pub trait ExceptionStore: Send + Sync {
    /// Look up an exception by its natural key.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<InterfaceException>>;

    /// Insert or update an exception, keyed by transaction id.
    async fn save(&self, exception: InterfaceException) -> Result<InterfaceException>;

    /// Count exceptions processed since the given instant (all customers).
    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Exceptions for one customer processed since the given instant.
    async fn find_by_customer_since(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<InterfaceException>>;

    /// Exceptions with the same interface type and severity processed since
    /// the given instant (the alerting cohort query).
    async fn find_similar_since(
        &self,
        interface_type: InterfaceType,
        severity: ExceptionSeverity,
        since: DateTime<Utc>,
    ) -> Result<Vec<InterfaceException>>;
}

/// Aggregate retry-attempt counts for one exception.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryStatistics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub pending: u64,
}

/// Durable storage for retry attempts, owned by their exception.
#[async_trait]
pub trait RetryAttemptStore: Send + Sync {
    /// Insert or update an attempt, keyed by attempt id.
    ///
    /// Implementations must reject a save that would leave two attempts for
    /// the same exception in `Pending` state at once.
    async fn save(&self, attempt: RetryAttempt) -> Result<RetryAttempt>;

    /// All attempts for an exception, ordered by attempt number.
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Vec<RetryAttempt>>;

    /// A single attempt by exception and attempt number.
    async fn find_attempt(
        &self,
        transaction_id: &str,
        attempt_number: u32,
    ) -> Result<Option<RetryAttempt>>;

    /// The highest-numbered attempt for an exception, if any.
    async fn latest_attempt(&self, transaction_id: &str) -> Result<Option<RetryAttempt>>;

    /// The attempt number the next initiation should use (1 if none exist).
    async fn next_attempt_number(&self, transaction_id: &str) -> Result<u32>;

    /// Aggregate counts for an exception's attempts.
    async fn statistics(&self, transaction_id: &str) -> Result<RetryStatistics> {
        let attempts = self.find_by_transaction_id(transaction_id).await?;
        let mut stats = RetryStatistics {
            total: attempts.len() as u64,
            ..Default::default()
        };
        for attempt in &attempts {
            match attempt.status {
                RetryStatus::Success => stats.successful += 1,
                RetryStatus::Failed => stats.failed += 1,
                RetryStatus::Pending => stats.pending += 1,
            }
        }
        Ok(stats)
    }
}

pub use memory::{InMemoryExceptionStore, InMemoryRetryAttemptStore};
