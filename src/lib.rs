//! # Exception Collector Core
//!
//! Lifecycle and retry-orchestration core for failed interface transactions.
//!
//! Inbound failure events from upstream business interfaces (orders,
//! collections, distributions) are classified and deduplicated into
//! exception records, which then move through an explicit status state
//! machine. Operators can acknowledge and resolve exceptions, or initiate
//! retries that resubmit the original payload to the source system through
//! a circuit-broken gateway. Alerting rules evaluate every processed
//! exception, and an eager invalidation policy keeps the derived read
//! caches consistent.
//!
//! ## Architecture
//!
//! - **classification**: keyword rule tables and the event processing
//!   service (ingest, classify, dedup, enrich)
//! - **state_machine**: lifecycle states, the legal-transition table, and
//!   guarded transitions
//! - **retry**: attempt bookkeeping and the async resubmission pipeline
//! - **management**: operator acknowledge/resolve actions
//! - **alerting**: independent alert rules with team routing
//! - **gateway** / **resilience**: source service clients behind a circuit
//!   breaker, per-call timeouts, and bounded backoff
//! - **store**: persistence contracts plus in-memory implementations
//! - **events** / **cache**: notification channel and cache invalidation
//!
//! ## Example
//!
//! ```rust
//! use exception_collector_core::cache::{CacheInvalidationService, ExceptionCaches};
//! use exception_collector_core::classification::ExceptionProcessingService;
//! use exception_collector_core::alerting::AlertingService;
//! use exception_collector_core::config::CollectorConfig;
//! use exception_collector_core::events::{
//!     EventEnvelope, EventPublisher, InboundEvent, OrderRejectedPayload,
//! };
//! use exception_collector_core::gateway::SourceServiceClientRegistry;
//! use exception_collector_core::store::InMemoryExceptionStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfig::default();
//! let store = Arc::new(InMemoryExceptionStore::new());
//! let publisher = EventPublisher::new(config.event_channel_capacity);
//! let caches = Arc::new(ExceptionCaches::new());
//! let alerting = Arc::new(AlertingService::new(
//!     store.clone(),
//!     publisher.clone(),
//!     config.alert_thresholds.clone(),
//! ));
//! let processing = ExceptionProcessingService::new(
//!     store,
//!     Arc::new(SourceServiceClientRegistry::new()),
//!     alerting,
//!     CacheInvalidationService::new(caches),
//!     config.enrichment_timeout,
//! );
//!
//! let event = InboundEvent::OrderRejected(EventEnvelope::new(
//!     "OrderRejected",
//!     "order-service",
//!     OrderRejectedPayload {
//!         transaction_id: "TXN-1001".to_string(),
//!         external_id: Some("ORD-1001".to_string()),
//!         operation: Some("CREATE_ORDER".to_string()),
//!         rejected_reason: "Order already exists".to_string(),
//!         customer_id: Some("CUST-7".to_string()),
//!         location_code: None,
//!     },
//! ));
//! let exception = processing.process_event(&event).await?;
//! assert!(!exception.retryable);
//! # Ok(())
//! # }
//! ```

pub mod alerting;
pub mod cache;
pub mod classification;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod management;
pub mod models;
pub mod resilience;
pub mod retry;
pub mod state_machine;
pub mod store;

pub use alerting::{AlertLevel, AlertReason, AlertingService, CriticalAlert, EscalationTeam};
pub use classification::ExceptionProcessingService;
pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use events::{EventPublisher, InboundEvent, Notification};
pub use management::ExceptionManagementService;
pub use models::{
    ExceptionCategory, ExceptionSeverity, InterfaceException, InterfaceType, RetryAttempt,
    RetryStatus,
};
pub use retry::{RetryResponse, RetryService};
pub use state_machine::{ExceptionStatus, StatusTransitionService};
