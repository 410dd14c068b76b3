use crate::config::AppConfig;
use crate::processor::subscription::InboundMessage;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Counts consecutive broker errors and trips once `max_failures` is reached.
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    max_failures: u32,
}

impl CircuitBreaker {
    pub fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures: max_failures.max(1),
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Returns the failure count after this one.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// Sleeps unless shutdown fires first. `false` means shutdown.
async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Starts the Kafka consumer with SASL authentication and a circuit breaker.
pub async fn start_kafka_consumer(
    config: &AppConfig,
    inbound: mpsc::Sender<InboundMessage>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!("Initializing Kafka consumer for topic: {}", config.kafka_topic);

    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("group.id", &config.kafka_group_id)
        .set("auto.offset.reset", &config.kafka_auto_offset_reset)
        .set("security.protocol", &config.kafka_security_protocol);
    if !config.kafka_username.is_empty() {
        client_config
            .set("sasl.mechanism", &config.kafka_sasl_mechanism)
            .set("sasl.username", &config.kafka_username)
            .set("sasl.password", &config.kafka_password);
    }

    let consumer: StreamConsumer = client_config.create()?;

    consumer.subscribe(&[&config.kafka_topic])?;
    info!("Subscribed to topic: {}", config.kafka_topic);

    let mut breaker = CircuitBreaker::new(config.kafka_max_retries);
    let cooldown = Duration::from_secs(config.kafka_circuit_breaker_cooldown);

    loop {
        if breaker.is_open() {
            warn!(
                "Circuit breaker tripped! Sleeping for {} seconds...",
                config.kafka_circuit_breaker_cooldown
            );
            if !pause(&shutdown, cooldown).await {
                break;
            }
            breaker.reset();
            info!("Circuit breaker reset. Resuming consumption.");
        }

        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            r = consumer.recv() => r,
        };

        let payload = match received {
            Ok(m) => {
                breaker.record_success();
                m.payload().map(<[u8]>::to_vec)
            }
            Err(e) => {
                let failures = breaker.record_failure();
                error!(
                    "Kafka error: {}. Consecutive failures: {} / {}",
                    e, failures, config.kafka_max_retries
                );
                if !pause(&shutdown, ERROR_BACKOFF).await {
                    break;
                }
                continue;
            }
        };

        let Some(payload) = payload else {
            warn!("Received empty payload from Kafka");
            continue;
        };

        let message = InboundMessage {
            source: "kafka",
            payload,
        };
        if inbound.send(message).await.is_err() {
            warn!("Subscription handler gone, stopping Kafka consumer");
            break;
        }
    }

    info!("Kafka consumer stopped");
    Ok(())
}
