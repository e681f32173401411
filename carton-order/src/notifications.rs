use std::sync::Arc;

use carton_core::FulfillResult;

use crate::models::{Notification, NotificationChannel, NotificationEvent};
use crate::repository::NotificationRepository;

/// Records outbound notification intents. Delivery is an external
/// dispatcher's job; this component's contract ends at the durable record.
#[derive(Clone)]
pub struct NotificationQueue {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationQueue {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Append a pending notification record.
    pub async fn enqueue(
        &self,
        order_id: &str,
        user_id: &str,
        event: NotificationEvent,
        channel: NotificationChannel,
    ) -> FulfillResult<()> {
        let notification = Notification::new(order_id, user_id, event, channel);
        self.repo.enqueue(&notification).await
    }

    /// Best-effort enqueue: a failed notification record must never block
    /// the order state machine, so errors are logged and swallowed.
    pub async fn enqueue_best_effort(
        &self,
        order_id: &str,
        user_id: &str,
        event: NotificationEvent,
        channel: NotificationChannel,
    ) {
        if let Err(err) = self.enqueue(order_id, user_id, event, channel).await {
            tracing::warn!(
                order_id,
                ?event,
                error = %err,
                "failed to enqueue notification, continuing"
            );
        }
    }
}
