//! # State Machine Module
//!
//! Exception lifecycle states, the legal-transition table, and the service
//! that applies guarded transitions with their side effects.

pub mod machine;
pub mod states;

pub use machine::StatusTransitionService;
pub use states::ExceptionStatus;
