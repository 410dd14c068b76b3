//! Competing-consumer poll loops over the durable queues.
//!
//! A message is deleted only after its handler succeeds. Failures leave it
//! in flight so the visibility timeout makes it receivable again; messages
//! that keep failing past `max_receives` go to the dead-letter sink.

use crate::config::AppConfig;
use crate::error::QueueError;
use crate::queue::{Queue, QueueMessage};
use crate::store::DeadLetterSink;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub mod notification;
pub mod report;

pub use notification::NotificationHandler;
pub use report::ReportHandler;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new<E: std::fmt::Display>(error: E) -> Self {
        Self(error.to_string())
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    type Event: DeserializeOwned + Send;

    fn kind(&self) -> &'static str;

    /// Must be safe to run more than once for the same event.
    async fn handle(&self, event: Self::Event) -> Result<(), HandlerError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumerSettings {
    pub batch_size: u32,
    pub wait: Duration,
    pub visibility_timeout: Duration,
    pub max_receives: i32,
}

impl ConsumerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.queue_batch_size,
            wait: config.queue_wait(),
            visibility_timeout: config.visibility_timeout(),
            max_receives: config.queue_max_receives.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acked,
    Retained,
    DeadLettered,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub received: usize,
    pub acked: usize,
    pub retained: usize,
    pub dead_lettered: usize,
}

impl BatchStats {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Acked => self.acked += 1,
            Outcome::Retained => self.retained += 1,
            Outcome::DeadLettered => self.dead_lettered += 1,
        }
    }
}

pub struct ConsumerLoop<H> {
    queue: Arc<dyn Queue>,
    handler: H,
    dead_letters: Arc<dyn DeadLetterSink>,
    settings: ConsumerSettings,
}

impl<H: MessageHandler> ConsumerLoop<H> {
    pub fn new(
        queue: Arc<dyn Queue>,
        handler: H,
        dead_letters: Arc<dyn DeadLetterSink>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            queue,
            handler,
            dead_letters,
            settings,
        }
    }

    /// Polls until `shutdown` fires. A batch already received is finished
    /// before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(queue = self.queue.name(), "{} consumer started", self.handler.kind());

        while !shutdown.is_cancelled() {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.receive() => received,
            };

            match received {
                Ok(messages) => {
                    self.process_batch(messages).await;
                }
                Err(e) => {
                    warn!(queue = self.queue.name(), "Receive failed: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }

        info!(queue = self.queue.name(), "{} consumer stopped", self.handler.kind());
    }

    /// One receive plus processing of everything received.
    pub async fn poll_once(&self) -> Result<BatchStats, QueueError> {
        let messages = self.receive().await?;
        Ok(self.process_batch(messages).await)
    }

    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
        self.queue
            .receive(
                self.settings.batch_size,
                self.settings.wait,
                self.settings.visibility_timeout,
            )
            .await
    }

    async fn process_batch(&self, messages: Vec<QueueMessage>) -> BatchStats {
        // Receipts not yet acked, retained or dead-lettered.
        let held = Mutex::new(
            messages
                .iter()
                .map(|m| m.receipt_handle.clone())
                .collect::<Vec<_>>(),
        );

        let work = async {
            let mut stats = BatchStats {
                received: messages.len(),
                ..BatchStats::default()
            };
            for message in &messages {
                let outcome = self.process(message).await;
                release(&held, &message.receipt_handle);
                stats.count(outcome);
            }
            stats
        };

        self.with_heartbeat(&held, work).await
    }

    async fn process(&self, message: &QueueMessage) -> Outcome {
        let queue = self.queue.name();

        if message.receive_count > self.settings.max_receives {
            let reason = format!(
                "exceeded {} receives",
                self.settings.max_receives
            );
            return self.dead_letter(message, &reason).await;
        }

        let event: H::Event = match serde_json::from_str(&message.body) {
            Ok(event) => event,
            Err(e) => {
                let reason = format!("undecodable {} message: {}", self.handler.kind(), e);
                return self.dead_letter(message, &reason).await;
            }
        };

        debug!(
            queue,
            message_id = %message.message_id,
            receive_count = message.receive_count,
            "Processing {} message",
            self.handler.kind()
        );

        match self.handler.handle(event).await {
            Ok(()) => match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => Outcome::Acked,
                Err(e) => {
                    // Handled but not acked; redelivery must be absorbed by the handler.
                    warn!(queue, message_id = %message.message_id, "Delete failed: {}", e);
                    Outcome::Retained
                }
            },
            Err(e) => {
                warn!(
                    queue,
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    "{} handler failed, leaving message for redelivery: {}",
                    self.handler.kind(),
                    e
                );
                Outcome::Retained
            }
        }
    }

    /// Keeps every held message of the batch hidden until `work` finishes,
    /// so competing consumers never see a message this batch still owns.
    async fn with_heartbeat<F>(&self, held: &Mutex<Vec<String>>, work: F) -> F::Output
    where
        F: std::future::Future,
    {
        let period = self.settings.visibility_timeout / 2;
        if period.is_zero() {
            return work.await;
        }

        let mut ticks = interval_at(Instant::now() + period, period);
        tokio::pin!(work);
        loop {
            tokio::select! {
                result = &mut work => return result,
                _ = ticks.tick() => self.extend_held(held).await,
            }
        }
    }

    async fn extend_held(&self, held: &Mutex<Vec<String>>) {
        let receipts = held.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for receipt in receipts {
            if let Err(e) = self
                .queue
                .extend_visibility(&receipt, self.settings.visibility_timeout)
                .await
            {
                warn!(
                    queue = self.queue.name(),
                    receipt_handle = %receipt,
                    "Failed to extend visibility: {}",
                    e
                );
            }
        }
    }

    async fn dead_letter(&self, message: &QueueMessage, reason: &str) -> Outcome {
        let queue = self.queue.name();
        error!(
            queue,
            message_id = %message.message_id,
            receive_count = message.receive_count,
            "Moving message to dead-letter: {}",
            reason
        );

        if let Err(e) = self
            .dead_letters
            .record(queue, &message.body, reason, message.receive_count)
            .await
        {
            warn!(queue, message_id = %message.message_id, "Dead-letter write failed: {}", e);
            return Outcome::Retained;
        }

        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            warn!(queue, message_id = %message.message_id, "Delete after dead-letter failed: {}", e);
        }
        Outcome::DeadLettered
    }
}

fn release(held: &Mutex<Vec<String>>, receipt_handle: &str) {
    held.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|r| r != receipt_handle);
}
