use crate::error::{CollectorError, Result};
use crate::resilience::{CircuitBreakerConfig, RetryPolicyConfig};
use std::time::Duration;

/// Thresholds driving the alerting rules.
#[derive(Debug, Clone)]
pub struct AlertThresholds {
    /// Retry count above which a multiple-retries alert fires
    pub multiple_retry: u32,
    /// Retry count above which the alert escalates to EMERGENCY
    pub emergency_retry: u32,
    /// Daily exception count at which customer-impact alerting triggers
    pub high_customer_impact: u64,
    /// Affected-customer count at which the alert escalates to EMERGENCY
    pub severe_customer_impact: u64,
    /// Safety cap on the affected-customer estimate
    pub affected_customer_cap: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            multiple_retry: 3,
            emergency_retry: 5,
            high_customer_impact: 10,
            severe_customer_impact: 50,
            affected_customer_cap: 100,
        }
    }
}

/// Top-level configuration for the collector core.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Bounded wait for best-effort context enrichment calls
    pub enrichment_timeout: Duration,
    /// Window reported as the estimated completion time of a retry
    pub retry_estimate: Duration,
    /// Capacity of the outbound notification channel
    pub event_channel_capacity: usize,
    pub alert_thresholds: AlertThresholds,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry_policy: RetryPolicyConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enrichment_timeout: Duration::from_secs(10),
            retry_estimate: Duration::from_secs(300),
            event_channel_capacity: 1000,
            alert_thresholds: AlertThresholds::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry_policy: RetryPolicyConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout_ms) = std::env::var("COLLECTOR_ENRICHMENT_TIMEOUT_MS") {
            config.enrichment_timeout = Duration::from_millis(parse_env(
                "COLLECTOR_ENRICHMENT_TIMEOUT_MS",
                &timeout_ms,
            )?);
        }

        if let Ok(estimate_secs) = std::env::var("COLLECTOR_RETRY_ESTIMATE_SECS") {
            config.retry_estimate =
                Duration::from_secs(parse_env("COLLECTOR_RETRY_ESTIMATE_SECS", &estimate_secs)?);
        }

        if let Ok(capacity) = std::env::var("COLLECTOR_EVENT_CHANNEL_CAPACITY") {
            config.event_channel_capacity =
                parse_env("COLLECTOR_EVENT_CHANNEL_CAPACITY", &capacity)?;
        }

        if let Ok(threshold) = std::env::var("COLLECTOR_MULTIPLE_RETRY_THRESHOLD") {
            config.alert_thresholds.multiple_retry =
                parse_env("COLLECTOR_MULTIPLE_RETRY_THRESHOLD", &threshold)?;
        }

        if let Ok(threshold) = std::env::var("COLLECTOR_CB_FAILURE_THRESHOLD") {
            config.circuit_breaker.failure_threshold =
                parse_env("COLLECTOR_CB_FAILURE_THRESHOLD", &threshold)?;
        }

        if let Ok(attempts) = std::env::var("COLLECTOR_GATEWAY_MAX_ATTEMPTS") {
            config.retry_policy.max_attempts =
                parse_env("COLLECTOR_GATEWAY_MAX_ATTEMPTS", &attempts)?;
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| CollectorError::Configuration(format!("Invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_match_alerting_rules() {
        let config = CollectorConfig::default();
        assert_eq!(config.alert_thresholds.multiple_retry, 3);
        assert_eq!(config.alert_thresholds.emergency_retry, 5);
        assert_eq!(config.alert_thresholds.high_customer_impact, 10);
        assert_eq!(config.alert_thresholds.severe_customer_impact, 50);
        assert_eq!(config.enrichment_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_estimate, Duration::from_secs(300));
    }

    #[test]
    fn test_parse_env_error_is_configuration() {
        let result: Result<u32> = parse_env("SOME_VAR", "not-a-number");
        assert!(matches!(result, Err(CollectorError::Configuration(_))));
    }
}
