//! Durable at-least-once queues.
//!
//! A received message stays hidden for the visibility timeout. If it is not
//! deleted within that window it becomes receivable again, by this consumer
//! or a competing one.

use crate::error::QueueError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub mod pg;

pub use pg::PgQueue;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    /// Includes the current delivery.
    pub receive_count: i32,
    pub enqueued_at: DateTime<Utc>,
}

#[async_trait]
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, body: &str) -> Result<String, QueueError>;

    /// Waits at most `wait` for up to `max_messages` visible messages.
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;

    async fn extend_visibility(
        &self,
        receipt_handle: &str,
        visibility_timeout: Duration,
    ) -> Result<(), QueueError>;
}
