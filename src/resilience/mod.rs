//! # Resilience Module
//!
//! Fault tolerance for outbound source-service calls: a circuit breaker to
//! isolate failing systems, per-call timeouts, and bounded retry with
//! exponential backoff, composed by [`ResilientClient`].

pub mod circuit_breaker;
pub mod policy;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerMetrics, CircuitState,
};
pub use policy::{ResilientClient, RetryPolicyConfig};
