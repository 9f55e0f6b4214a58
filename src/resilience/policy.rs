//! Resilience policy composing circuit breaking, per-call timeouts, and
//! bounded retry with exponential backoff around outbound gateway calls.
//!
//! This is an explicit decorator rather than declarative annotations: the
//! policy wraps a closure and each layer is independently testable.

use crate::error::{CollectorError, Result};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the bounded retry + timeout layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Maximum attempts per logical call, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts
    pub base_delay: Duration,
    /// Upper bound on the backoff delay
    pub max_delay: Duration,
    /// Bounded wait per individual call
    pub call_timeout: Duration,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicyConfig {
    /// Backoff delay before the given retry (attempt numbers start at 1).
    fn backoff_delay(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// Circuit-breaker + timeout + bounded-retry wrapper for source service
/// calls. One instance guards one downstream component.
pub struct ResilientClient {
    breaker: CircuitBreaker,
    policy: RetryPolicyConfig,
}

impl ResilientClient {
    pub fn new(
        name: impl Into<String>,
        breaker_config: CircuitBreakerConfig,
        policy: RetryPolicyConfig,
    ) -> Self {
        Self {
            breaker: CircuitBreaker::new(name.into(), breaker_config),
            policy,
        }
    }

    /// Execute `operation` under the full resilience policy.
    ///
    /// Returns a structured `ExternalService` failure rather than blocking
    /// when the circuit is open, when every bounded attempt has failed, or
    /// when a call exceeds its timeout.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            let call = || async {
                match tokio::time::timeout(self.policy.call_timeout, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(CollectorError::ExternalService(format!(
                        "Call to {} timed out after {}ms",
                        self.breaker.name(),
                        self.policy.call_timeout.as_millis()
                    ))),
                }
            };

            match self.breaker.call(call).await {
                Ok(value) => return Ok(value),
                Err(CircuitBreakerError::CircuitOpen { component }) => {
                    return Err(CollectorError::ExternalService(format!(
                        "Circuit breaker is open for {component}"
                    )));
                }
                Err(CircuitBreakerError::OperationFailed(err)) => {
                    warn!(
                        component = self.breaker.name(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "Resilient call attempt failed"
                    );
                    last_error = Some(err);

                    if attempt < self.policy.max_attempts {
                        let delay = self.policy.backoff_delay(attempt);
                        debug!(
                            component = self.breaker.name(),
                            delay_ms = delay.as_millis(),
                            "Backing off before next attempt"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CollectorError::ExternalService(format!(
                "All {} attempts exhausted for {}",
                self.policy.max_attempts,
                self.breaker.name()
            ))
        }))
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitState;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicyConfig {
        RetryPolicyConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            call_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let policy = RetryPolicyConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            call_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(300));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let client = ResilientClient::new(
            "test-gateway",
            CircuitBreakerConfig {
                failure_threshold: 10,
                ..Default::default()
            },
            fast_policy(),
        );
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = calls.clone();
        let result = client
            .execute(move || {
                let calls = calls_ref.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(CollectorError::ExternalService("flaky".to_string()))
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let client = ResilientClient::new(
            "test-gateway",
            CircuitBreakerConfig {
                failure_threshold: 10,
                ..Default::default()
            },
            fast_policy(),
        );

        let result: Result<()> = client
            .execute(|| async {
                Err(CollectorError::ExternalService(
                    "persistent failure".to_string(),
                ))
            })
            .await;

        assert_eq!(
            result,
            Err(CollectorError::ExternalService(
                "persistent failure".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits() {
        let client = ResilientClient::new(
            "test-gateway",
            CircuitBreakerConfig {
                failure_threshold: 2,
                timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
            fast_policy(),
        );

        let _ = client
            .execute(|| async {
                Err::<(), _>(CollectorError::ExternalService("down".to_string()))
            })
            .await;
        assert_eq!(client.breaker().state(), CircuitState::Open);

        let calls = Arc::new(AtomicU32::new(0));
        let calls_ref = calls.clone();
        let result: Result<()> = client
            .execute(move || {
                let calls = calls_ref.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(CollectorError::ExternalService(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_call_timeout_is_a_failure() {
        let client = ResilientClient::new(
            "test-gateway",
            CircuitBreakerConfig {
                failure_threshold: 10,
                ..Default::default()
            },
            RetryPolicyConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                call_timeout: Duration::from_millis(10),
            },
        );

        let result: Result<()> = client
            .execute(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            })
            .await;

        match result {
            Err(CollectorError::ExternalService(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
}
