use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_DELIVERED: &str = "DELIVERED";

/// Audit row for a notification that reached its transport.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLog {
    pub id: Uuid,
    pub alert_id: Option<Uuid>,
    pub user_id: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotificationLog {
    pub alert_id: Uuid,
    pub user_id: String,
    pub message: String,
}
