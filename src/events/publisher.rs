use crate::events::outbound::Notification;
use tokio::sync::broadcast;

/// Process-owned publish/subscribe channel for outbound notifications.
///
/// Created once at startup and cloned into each service; there is no global
/// singleton. Downstream transports (message broker producers, subscription
/// bridges) subscribe and forward.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedNotification>,
}

/// Notification that has been published
#[derive(Debug, Clone)]
pub struct PublishedNotification {
    pub notification: Notification,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification.
    ///
    /// A broadcast send with zero subscribers is not an error; notifications
    /// are emitted whether or not anything is listening.
    pub fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        let published = PublishedNotification {
            notification,
            published_at: chrono::Utc::now(),
        };

        match self.sender.send(published) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to published notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedNotification> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Error types for notification publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Notification channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::new(16);
        let result = publisher.publish(Notification::RetryInitiated {
            transaction_id: "TXN-1".to_string(),
            attempt_number: 1,
            initiated_by: "operator".to_string(),
            initiated_at: Utc::now(),
        });
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_receives_notification() {
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        publisher
            .publish(Notification::RetryCompleted {
                transaction_id: "TXN-2".to_string(),
                attempt_number: 3,
                success: false,
                result_message: Some("Retry failed with status: 503".to_string()),
                initiated_by: "scheduler".to_string(),
                completed_at: Utc::now(),
            })
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.notification.name(), "RetryCompleted");
        assert_eq!(received.notification.transaction_id(), "TXN-2");
    }
}
