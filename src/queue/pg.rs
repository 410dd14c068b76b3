use crate::db::{queries, DbPool};
use crate::error::QueueError;
use crate::queue::{Queue, QueueMessage};
use async_trait::async_trait;
use sqlx::Row;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A named queue stored in the `queue_messages` table.
#[derive(Clone)]
pub struct PgQueue {
    pool: DbPool,
    name: String,
}

impl PgQueue {
    pub fn new(pool: DbPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    async fn claim(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let rows = sqlx::query(queries::CLAIM_MESSAGES)
            .bind(&self.name)
            .bind(i64::from(max_messages))
            .bind(visibility_timeout.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;

        let mut messages = rows
            .iter()
            .map(|row| -> Result<QueueMessage, sqlx::Error> {
                let id: i64 = row.try_get("id")?;
                let receipt: Uuid = row.try_get("receipt_handle")?;
                Ok(QueueMessage {
                    message_id: id.to_string(),
                    receipt_handle: receipt.to_string(),
                    body: row.try_get("body")?,
                    receive_count: row.try_get("receive_count")?,
                    enqueued_at: row.try_get("enqueued_at")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // RETURNING does not preserve the subquery order.
        messages.sort_by_key(|m| m.message_id.parse::<i64>().unwrap_or_default());
        Ok(messages)
    }
}

fn parse_receipt(receipt_handle: &str) -> Result<Uuid, QueueError> {
    Uuid::parse_str(receipt_handle)
        .map_err(|_| QueueError::Unavailable(format!("malformed receipt handle {receipt_handle}")))
}

#[async_trait]
impl Queue for PgQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, body: &str) -> Result<String, QueueError> {
        let row = sqlx::query(queries::ENQUEUE_MESSAGE)
            .bind(&self.name)
            .bind(body)
            .fetch_one(&self.pool)
            .await?;
        let id: i64 = row.try_get("id")?;
        Ok(id.to_string())
    }

    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let messages = self.claim(max_messages, visibility_timeout).await?;
            let now = Instant::now();
            if !messages.is_empty() || now >= deadline {
                return Ok(messages);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let deleted = sqlx::query(queries::DELETE_MESSAGE)
            .bind(&self.name)
            .bind(parse_receipt(receipt_handle)?)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            // The receipt expired and the message was handed out again.
            debug!(queue = %self.name, receipt_handle, "Delete matched no message");
        }
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt_handle: &str,
        visibility_timeout: Duration,
    ) -> Result<(), QueueError> {
        sqlx::query(queries::EXTEND_MESSAGE_VISIBILITY)
            .bind(&self.name)
            .bind(parse_receipt(receipt_handle)?)
            .bind(visibility_timeout.as_secs_f64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
