//! Keyword-driven classification rules for exception reasons.
//!
//! Rules are evaluated in declaration order against the lower-cased reason
//! text; the first match wins. Validation-error events bypass these tables
//! entirely and get a fixed classification.

use crate::models::{ExceptionCategory, ExceptionSeverity, InterfaceType};

const CRITICAL_KEYWORDS: &[&str] = &["system error", "internal error", "database", "critical"];

const HIGH_KEYWORDS: &[&str] = &[
    "timeout",
    "connection failed",
    "service unavailable",
    "authentication failed",
];

const MEDIUM_KEYWORDS: &[&str] = &["validation", "invalid", "already exists", "not found"];

const LOW_KEYWORDS: &[&str] = &["warning", "info"];

fn contains_any(reason: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| reason.contains(k))
}

/// Severity assignment. Interface-specific escalations sit between the
/// shared HIGH and MEDIUM keyword tables.
pub fn classify_severity(interface_type: InterfaceType, reason: &str) -> ExceptionSeverity {
    let reason = reason.to_lowercase();

    if contains_any(&reason, CRITICAL_KEYWORDS) {
        return ExceptionSeverity::Critical;
    }
    if contains_any(&reason, HIGH_KEYWORDS) {
        return ExceptionSeverity::High;
    }

    let interface_escalation = match interface_type {
        InterfaceType::Order => reason.contains("customer"),
        InterfaceType::Collection => reason.contains("donor") || reason.contains("sample"),
        InterfaceType::Distribution => {
            reason.contains("destination") || reason.contains("delivery")
        }
        _ => false,
    };
    if interface_escalation {
        return ExceptionSeverity::High;
    }

    if contains_any(&reason, MEDIUM_KEYWORDS) {
        return ExceptionSeverity::Medium;
    }
    if contains_any(&reason, LOW_KEYWORDS) {
        return ExceptionSeverity::Low;
    }

    ExceptionSeverity::Medium
}

/// Category assignment. Known-business-failure keywords take precedence so
/// that "duplicate" is never misread as a system problem; the
/// EXTERNAL_SERVICE bucket only exists for distribution failures.
pub fn classify_category(interface_type: InterfaceType, reason: &str) -> ExceptionCategory {
    let reason = reason.to_lowercase();

    if reason.contains("already exists") || reason.contains("duplicate") {
        return ExceptionCategory::BusinessRule;
    }
    if contains_any(&reason, &["validation", "invalid", "required"]) {
        return ExceptionCategory::Validation;
    }
    if reason.contains("timeout") || reason.contains("connection") {
        return ExceptionCategory::NetworkError;
    }
    if reason.contains("unauthorized") || reason.contains("forbidden") {
        return ExceptionCategory::Authorization;
    }
    if reason.contains("authentication") || reason.contains("credentials") {
        return ExceptionCategory::Authentication;
    }
    if reason.contains("system") || reason.contains("internal") {
        return ExceptionCategory::SystemError;
    }
    if interface_type == InterfaceType::Distribution
        && (reason.contains("external") || reason.contains("service"))
    {
        return ExceptionCategory::ExternalService;
    }

    ExceptionCategory::BusinessRule
}

/// Whether a retry against the source system could plausibly succeed.
/// Permanent business failures are non-retryable; transient transport
/// failures are; anything else defaults to retryable.
pub fn classify_retryable(reason: &str) -> bool {
    let reason = reason.to_lowercase();

    const NON_RETRYABLE_KEYWORDS: &[&str] = &[
        "already exists",
        "duplicate",
        "invalid format",
        "malformed",
        "authentication failed",
        "unauthorized",
    ];
    if contains_any(&reason, NON_RETRYABLE_KEYWORDS) {
        return false;
    }

    const RETRYABLE_KEYWORDS: &[&str] =
        &["timeout", "connection", "service unavailable", "temporary"];
    if contains_any(&reason, RETRYABLE_KEYWORDS) {
        return true;
    }

    true
}
