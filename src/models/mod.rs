//! Domain model layer: exceptions, retry attempts, and their enums.

pub mod exception;
pub mod retry_attempt;

pub use exception::{ExceptionCategory, ExceptionSeverity, InterfaceException, InterfaceType};
pub use retry_attempt::{RetryAttempt, RetryStatus};
