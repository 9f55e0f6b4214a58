use thiserror::Error;

/// Crate-wide error type for the exception collector core.
///
/// `NotFound` and `InvalidState` are the only variants surfaced to callers
/// of the synchronous operations; gateway and publish failures are absorbed
/// at their call sites and recorded on the affected records instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectorError {
    #[error("Exception not found for transaction: {transaction_id}")]
    NotFound { transaction_id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Context enrichment error: {0}")]
    Enrichment(String),

    #[error("Notification publish error: {0}")]
    Publish(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CollectorError {
    pub fn not_found(transaction_id: impl Into<String>) -> Self {
        Self::NotFound {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
