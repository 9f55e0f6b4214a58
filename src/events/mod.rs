//! Event system: inbound failure event contracts, outbound notifications,
//! and the process-owned publish/subscribe channel.

pub mod inbound;
pub mod outbound;
pub mod publisher;

pub use inbound::{
    CollectionRejectedPayload, DistributionFailedPayload, EventEnvelope, InboundEvent,
    OrderCancelledPayload, OrderRejectedPayload, ValidationErrorPayload, ValidationFieldError,
};
pub use outbound::Notification;
pub use publisher::{EventPublisher, PublishError, PublishedNotification};
