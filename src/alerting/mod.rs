//! Alerting engine: evaluates independent rules against an exception and
//! its cohort, and publishes critical alerts to the notification channel.
//!
//! Rules are not mutually exclusive; a single exception can produce several
//! alerts in one evaluation pass.

use crate::config::AlertThresholds;
use crate::events::{EventPublisher, Notification};
use crate::models::{
    ExceptionCategory, ExceptionSeverity, InterfaceException, InterfaceType,
};
use crate::store::ExceptionStore;
use chrono::{DateTime, Duration, Utc};
use futures::future;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Urgency of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Critical,
    Emergency,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// Which rule produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertReason {
    CriticalSeverity,
    MultipleRetriesFailed,
    SystemError,
    CustomerImpact,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriticalSeverity => write!(f, "CRITICAL_SEVERITY"),
            Self::MultipleRetriesFailed => write!(f, "MULTIPLE_RETRIES_FAILED"),
            Self::SystemError => write!(f, "SYSTEM_ERROR"),
            Self::CustomerImpact => write!(f, "CUSTOMER_IMPACT"),
        }
    }
}

/// Estimated blast radius of the underlying failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimatedImpact {
    Low,
    Medium,
    High,
    Severe,
}

/// Operational group an alert is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationTeam {
    Operations,
    Engineering,
    CustomerSuccess,
    Management,
}

impl fmt::Display for EscalationTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operations => write!(f, "OPERATIONS"),
            Self::Engineering => write!(f, "ENGINEERING"),
            Self::CustomerSuccess => write!(f, "CUSTOMER_SUCCESS"),
            Self::Management => write!(f, "MANAGEMENT"),
        }
    }
}

/// Alert payload published to the external notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalAlert {
    pub alert_id: Uuid,
    pub transaction_id: String,
    pub alert_level: AlertLevel,
    pub alert_reason: AlertReason,
    pub interface_type: InterfaceType,
    pub exception_reason: String,
    pub customer_id: Option<String>,
    pub escalation_team: EscalationTeam,
    pub retryable: bool,
    pub requires_acknowledgment: bool,
    pub estimated_impact: EstimatedImpact,
    pub affected_customer_count: Option<u64>,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Evaluates the alerting rules and publishes the resulting alerts.
pub struct AlertingService {
    store: Arc<dyn ExceptionStore>,
    publisher: EventPublisher,
    thresholds: AlertThresholds,
}

impl AlertingService {
    pub fn new(
        store: Arc<dyn ExceptionStore>,
        publisher: EventPublisher,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            store,
            publisher,
            thresholds,
        }
    }

    /// Run every rule against the exception. Each rule that matches emits
    /// one alert; publish failures are logged, never propagated.
    pub async fn evaluate_and_alert(&self, exception: &InterfaceException) -> Vec<CriticalAlert> {
        debug!(
            transaction_id = %exception.transaction_id,
            severity = %exception.severity,
            retry_count = exception.retry_count,
            "Evaluating exception for alerting"
        );

        let mut alerts = Vec::new();

        if exception.severity == ExceptionSeverity::Critical {
            alerts.push(self.critical_severity_alert(exception));
        }

        if exception.retry_count > self.thresholds.multiple_retry {
            alerts.push(self.multiple_retries_alert(exception));
        }

        if exception.category == ExceptionCategory::SystemError {
            alerts.push(self.system_error_alert(exception));
        }

        if let Some(alert) = self.customer_impact_alert(exception).await {
            alerts.push(alert);
        }

        for alert in &alerts {
            warn!(
                transaction_id = %exception.transaction_id,
                alert_level = %alert.alert_level,
                alert_reason = %alert.alert_reason,
                escalation_team = %alert.escalation_team,
                "🚨 Generating alert"
            );
            if let Err(e) = self
                .publisher
                .publish(Notification::CriticalAlert(alert.clone()))
            {
                error!(
                    transaction_id = %exception.transaction_id,
                    error = %e,
                    "Failed to publish alert notification"
                );
            }
        }

        alerts
    }

    fn critical_severity_alert(&self, exception: &InterfaceException) -> CriticalAlert {
        let impact = match exception.interface_type {
            InterfaceType::Order | InterfaceType::Distribution => EstimatedImpact::High,
            InterfaceType::Collection => EstimatedImpact::Severe,
            _ => EstimatedImpact::Medium,
        };
        self.build_alert(
            exception,
            AlertLevel::Critical,
            AlertReason::CriticalSeverity,
            impact,
            None,
        )
    }

    fn multiple_retries_alert(&self, exception: &InterfaceException) -> CriticalAlert {
        let (level, impact) = if exception.retry_count > self.thresholds.emergency_retry {
            (AlertLevel::Emergency, EstimatedImpact::Severe)
        } else {
            (AlertLevel::Critical, EstimatedImpact::High)
        };
        self.build_alert(
            exception,
            level,
            AlertReason::MultipleRetriesFailed,
            impact,
            None,
        )
    }

    fn system_error_alert(&self, exception: &InterfaceException) -> CriticalAlert {
        self.build_alert(
            exception,
            AlertLevel::Critical,
            AlertReason::SystemError,
            EstimatedImpact::Severe,
            None,
        )
    }

    /// Customer-impact rule. Two independent threshold checks, kept as-is
    /// from the source system: the trigger looks at the same-day exception
    /// count and the customer's own day cohort, and the EMERGENCY upgrade
    /// looks at the distinct-customer estimate from the similar-exception
    /// cohort of the last hour.
    async fn customer_impact_alert(
        &self,
        exception: &InterfaceException,
    ) -> Option<CriticalAlert> {
        let customer_id = exception.customer_id.as_deref()?;

        let one_day_ago = Utc::now() - Duration::days(1);
        let (day_count, customer_cohort) = match future::try_join(
            self.store.count_since(one_day_ago),
            self.store.find_by_customer_since(customer_id, one_day_ago),
        )
        .await
        {
            Ok((count, cohort)) => (count, cohort.len() as u64),
            Err(e) => {
                error!(error = %e, "Customer-impact cohort query failed");
                return None;
            }
        };

        if day_count <= self.thresholds.high_customer_impact
            && customer_cohort <= self.thresholds.high_customer_impact
        {
            return None;
        }

        let affected = self.estimate_affected_customers(exception).await;
        let (level, impact) = if affected > self.thresholds.severe_customer_impact {
            (AlertLevel::Emergency, EstimatedImpact::Severe)
        } else {
            (AlertLevel::Critical, EstimatedImpact::High)
        };

        Some(self.build_alert(
            exception,
            level,
            AlertReason::CustomerImpact,
            impact,
            Some(affected),
        ))
    }

    /// Distinct customers among similar exceptions in the last hour,
    /// capped for safety.
    async fn estimate_affected_customers(&self, exception: &InterfaceException) -> u64 {
        let one_hour_ago = Utc::now() - Duration::hours(1);
        let similar = match self
            .store
            .find_similar_since(exception.interface_type, exception.severity, one_hour_ago)
            .await
        {
            Ok(similar) => similar,
            Err(e) => {
                error!(error = %e, "Similar-exception cohort query failed");
                return 0;
            }
        };

        let distinct: HashSet<&str> = similar
            .iter()
            .filter_map(|e| e.customer_id.as_deref())
            .collect();
        (distinct.len() as u64).min(self.thresholds.affected_customer_cap)
    }

    fn build_alert(
        &self,
        exception: &InterfaceException,
        level: AlertLevel,
        reason: AlertReason,
        impact: EstimatedImpact,
        affected_customer_count: Option<u64>,
    ) -> CriticalAlert {
        CriticalAlert {
            alert_id: Uuid::new_v4(),
            transaction_id: exception.transaction_id.clone(),
            alert_level: level,
            alert_reason: reason,
            interface_type: exception.interface_type,
            exception_reason: exception.exception_reason.clone(),
            customer_id: exception.customer_id.clone(),
            escalation_team: determine_escalation_team(level, reason),
            retryable: exception.retryable,
            requires_acknowledgment: true,
            estimated_impact: impact,
            affected_customer_count,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

/// Routing table for alerts: EMERGENCY always goes to management, otherwise
/// the rule determines the team.
pub fn determine_escalation_team(level: AlertLevel, reason: AlertReason) -> EscalationTeam {
    if level == AlertLevel::Emergency {
        return EscalationTeam::Management;
    }
    match reason {
        AlertReason::SystemError => EscalationTeam::Engineering,
        AlertReason::CustomerImpact => EscalationTeam::CustomerSuccess,
        AlertReason::MultipleRetriesFailed | AlertReason::CriticalSeverity => {
            EscalationTeam::Operations
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryExceptionStore;
    use chrono::Utc;

    fn service_with_store() -> (AlertingService, Arc<InMemoryExceptionStore>) {
        let store = Arc::new(InMemoryExceptionStore::new());
        let service = AlertingService::new(
            store.clone(),
            EventPublisher::new(64),
            AlertThresholds::default(),
        );
        (service, store)
    }

    fn sample_exception() -> InterfaceException {
        InterfaceException::new(
            "TXN-ALERT",
            InterfaceType::Order,
            "System internal error",
            Utc::now(),
        )
    }

    #[test]
    fn test_escalation_team_routing() {
        assert_eq!(
            determine_escalation_team(AlertLevel::Emergency, AlertReason::CriticalSeverity),
            EscalationTeam::Management
        );
        assert_eq!(
            determine_escalation_team(AlertLevel::Critical, AlertReason::SystemError),
            EscalationTeam::Engineering
        );
        assert_eq!(
            determine_escalation_team(AlertLevel::Critical, AlertReason::CustomerImpact),
            EscalationTeam::CustomerSuccess
        );
        assert_eq!(
            determine_escalation_team(AlertLevel::Critical, AlertReason::MultipleRetriesFailed),
            EscalationTeam::Operations
        );
    }

    #[tokio::test]
    async fn test_rules_fire_independently() {
        let (service, _store) = service_with_store();
        let mut exception = sample_exception();
        exception.severity = ExceptionSeverity::Critical;
        exception.category = ExceptionCategory::SystemError;
        exception.retry_count = 6;

        let alerts = service.evaluate_and_alert(&exception).await;
        let reasons: Vec<AlertReason> = alerts.iter().map(|a| a.alert_reason).collect();
        assert!(reasons.contains(&AlertReason::CriticalSeverity));
        assert!(reasons.contains(&AlertReason::MultipleRetriesFailed));
        assert!(reasons.contains(&AlertReason::SystemError));
        assert_eq!(alerts.len(), 3);
    }

    #[tokio::test]
    async fn test_multiple_retries_emergency_upgrade() {
        let (service, _store) = service_with_store();
        let mut exception = sample_exception();
        exception.retry_count = 6;

        let alerts = service.evaluate_and_alert(&exception).await;
        let retry_alert = alerts
            .iter()
            .find(|a| a.alert_reason == AlertReason::MultipleRetriesFailed)
            .unwrap();
        assert_eq!(retry_alert.alert_level, AlertLevel::Emergency);
        assert_eq!(retry_alert.escalation_team, EscalationTeam::Management);
        assert_eq!(retry_alert.estimated_impact, EstimatedImpact::Severe);
    }

    #[tokio::test]
    async fn test_multiple_retries_critical_below_emergency() {
        let (service, _store) = service_with_store();
        let mut exception = sample_exception();
        exception.retry_count = 4;

        let alerts = service.evaluate_and_alert(&exception).await;
        let retry_alert = alerts
            .iter()
            .find(|a| a.alert_reason == AlertReason::MultipleRetriesFailed)
            .unwrap();
        assert_eq!(retry_alert.alert_level, AlertLevel::Critical);
        assert_eq!(retry_alert.escalation_team, EscalationTeam::Operations);
    }

    #[tokio::test]
    async fn test_collection_critical_severity_impact_is_severe() {
        let (service, _store) = service_with_store();
        let mut exception = sample_exception();
        exception.interface_type = InterfaceType::Collection;
        exception.severity = ExceptionSeverity::Critical;
        exception.category = ExceptionCategory::BusinessRule;

        let alerts = service.evaluate_and_alert(&exception).await;
        let severity_alert = alerts
            .iter()
            .find(|a| a.alert_reason == AlertReason::CriticalSeverity)
            .unwrap();
        assert_eq!(severity_alert.estimated_impact, EstimatedImpact::Severe);
    }

    #[tokio::test]
    async fn test_customer_impact_requires_customer_and_threshold() {
        let (service, store) = service_with_store();

        // Below threshold: no customer-impact alert even with a customer id
        let mut exception = sample_exception();
        exception.customer_id = Some("CUST-1".to_string());
        exception.severity = ExceptionSeverity::Medium;
        exception.category = ExceptionCategory::BusinessRule;
        let alerts = service.evaluate_and_alert(&exception).await;
        assert!(alerts.is_empty());

        // Seed enough same-day exceptions to cross the threshold
        use crate::store::ExceptionStore as _;
        for i in 0..12 {
            let mut seeded = InterfaceException::new(
                format!("TXN-SEED-{i}"),
                InterfaceType::Order,
                "Connection timeout",
                Utc::now(),
            );
            seeded.customer_id = Some(format!("CUST-{i}"));
            store.save(seeded).await.unwrap();
        }

        let alerts = service.evaluate_and_alert(&exception).await;
        let impact_alert = alerts
            .iter()
            .find(|a| a.alert_reason == AlertReason::CustomerImpact)
            .unwrap();
        assert_eq!(impact_alert.alert_level, AlertLevel::Critical);
        assert_eq!(impact_alert.escalation_team, EscalationTeam::CustomerSuccess);
        assert!(impact_alert.affected_customer_count.is_some());
    }

    #[tokio::test]
    async fn test_customer_impact_emergency_upgrade_on_wide_blast_radius() {
        let (service, store) = service_with_store();

        // A failure touching more than 50 distinct customers in the
        // last-hour similar cohort
        use crate::store::ExceptionStore as _;
        for i in 0..60 {
            let mut seeded = InterfaceException::new(
                format!("TXN-WIDE-{i}"),
                InterfaceType::Order,
                "Connection timeout",
                Utc::now(),
            );
            seeded.customer_id = Some(format!("CUST-{i}"));
            store.save(seeded).await.unwrap();
        }

        let mut exception = sample_exception();
        exception.customer_id = Some("CUST-0".to_string());
        exception.severity = ExceptionSeverity::Medium;
        exception.category = ExceptionCategory::BusinessRule;

        let alerts = service.evaluate_and_alert(&exception).await;
        let impact_alert = alerts
            .iter()
            .find(|a| a.alert_reason == AlertReason::CustomerImpact)
            .unwrap();
        assert_eq!(impact_alert.alert_level, AlertLevel::Emergency);
        assert_eq!(impact_alert.escalation_team, EscalationTeam::Management);
        assert_eq!(impact_alert.estimated_impact, EstimatedImpact::Severe);
        assert_eq!(impact_alert.affected_customer_count, Some(60));
    }
}
