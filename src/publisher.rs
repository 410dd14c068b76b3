use crate::config::AppConfig;
use crate::models::{AlertEvent, RefinedReportEvent};
use crate::queue::Queue;
use crate::store::DeadLetterSink;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.publish_max_attempts.max(1),
            base_backoff: Duration::from_millis(config.publish_base_backoff_ms),
            max_backoff: Duration::from_millis(config.publish_max_backoff_ms),
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Pushes events onto the alert and report queues without blocking the caller.
///
/// Each publish runs on its own task with bounded retries. Exhausted publishes
/// go to the dead-letter sink.
#[derive(Clone)]
pub struct EventPublisher {
    alert_queue: Arc<dyn Queue>,
    report_queue: Arc<dyn Queue>,
    dead_letters: Arc<dyn DeadLetterSink>,
    retry: RetryPolicy,
    tracker: TaskTracker,
}

impl EventPublisher {
    pub fn new(
        alert_queue: Arc<dyn Queue>,
        report_queue: Arc<dyn Queue>,
        dead_letters: Arc<dyn DeadLetterSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            alert_queue,
            report_queue,
            dead_letters,
            retry,
            tracker: TaskTracker::new(),
        }
    }

    pub fn publish_alert(&self, event: &AlertEvent) {
        self.dispatch(Arc::clone(&self.alert_queue), event, "alert");
    }

    pub fn publish_report(&self, event: &RefinedReportEvent) {
        self.dispatch(Arc::clone(&self.report_queue), event, "report");
    }

    /// Waits for every publish started so far.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn dispatch<T: Serialize>(&self, queue: Arc<dyn Queue>, event: &T, kind: &'static str) {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to encode {} event: {}", kind, e);
                return;
            }
        };

        let dead_letters = Arc::clone(&self.dead_letters);
        let retry = self.retry;
        self.tracker.spawn(async move {
            deliver(queue.as_ref(), dead_letters.as_ref(), retry, &body, kind).await;
        });
    }
}

async fn deliver(
    queue: &dyn Queue,
    dead_letters: &dyn DeadLetterSink,
    retry: RetryPolicy,
    body: &str,
    kind: &str,
) {
    let mut last_error = String::new();

    for attempt in 1..=retry.max_attempts {
        match queue.send(body).await {
            Ok(message_id) => {
                info!(queue = queue.name(), message_id = %message_id, "{} event published", kind);
                return;
            }
            Err(e) => {
                last_error = e.to_string();
                warn!(
                    queue = queue.name(),
                    "Publishing {} event failed (attempt {} / {}): {}",
                    kind,
                    attempt,
                    retry.max_attempts,
                    e
                );
                if attempt < retry.max_attempts {
                    tokio::time::sleep(retry.backoff(attempt)).await;
                }
            }
        }
    }

    let reason = format!("publish failed after {} attempts: {}", retry.max_attempts, last_error);
    error!(queue = queue.name(), "Dropping {} event to dead-letter: {}", kind, reason);
    if let Err(e) = dead_letters.record(queue.name(), body, &reason, 0).await {
        error!(queue = queue.name(), body, "Dead-letter write failed, event lost: {}", e);
    }
}
