use crate::consumer::{HandlerError, MessageHandler};
use crate::models::{AlertEvent, NewNotificationLog};
use crate::notifier::{Notification, Notifier};
use crate::store::NotificationLogStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Emails a human about each theft alert.
///
/// A delivered alert is never sent again. If the send succeeds but recording
/// the delivery fails, the message is retained and the redelivery sends a
/// second email.
pub struct NotificationHandler {
    notifier: Arc<dyn Notifier>,
    logs: Arc<dyn NotificationLogStore>,
    from: String,
    to: String,
}

impl NotificationHandler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        logs: Arc<dyn NotificationLogStore>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            logs,
            from: from.into(),
            to: to.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for NotificationHandler {
    type Event = AlertEvent;

    fn kind(&self) -> &'static str {
        "notification"
    }

    async fn handle(&self, event: AlertEvent) -> Result<(), HandlerError> {
        // A redelivery of an already notified alert only needs acking.
        if self.logs.delivered(event.alert_id).await.map_err(HandlerError::new)? {
            info!(alert_id = %event.alert_id, "Alert already notified, skipping");
            return Ok(());
        }

        let notification = Notification::theft_alert(&event, &self.from, &self.to);
        self.notifier
            .send(&notification)
            .await
            .map_err(HandlerError::new)?;

        let log = self
            .logs
            .record_delivery(&NewNotificationLog {
                alert_id: event.alert_id,
                user_id: event.driver_id.clone(),
                message: event.message.clone(),
            })
            .await
            .map_err(HandlerError::new)?;

        info!(
            alert_id = %event.alert_id,
            vehicle_id = %event.vehicle_id,
            notification_log_id = %log.id,
            "Theft alert notification sent"
        );
        Ok(())
    }
}
