//! # Classification Module
//!
//! Event ingestion pipeline: keyword-driven classification rules and the
//! processing service that turns inbound failure events into persisted
//! exception records.

pub mod processor;
pub mod rules;

pub use processor::ExceptionProcessingService;
pub use rules::{classify_category, classify_retryable, classify_severity};
