pub mod kafka;
pub mod mqtt;

use crate::config::{AppConfig, TelemetryTransport};
use crate::processor::subscription::InboundMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the configured broker client until shutdown, feeding raw payloads
/// into `inbound`.
pub async fn run(
    config: AppConfig,
    inbound: mpsc::Sender<InboundMessage>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match config.telemetry_transport {
        TelemetryTransport::Mqtt => mqtt::start_mqtt_client(&config, inbound, shutdown).await,
        TelemetryTransport::Kafka => kafka::start_kafka_consumer(&config, inbound, shutdown).await,
        TelemetryTransport::Disabled => {
            info!("Telemetry transport disabled, readings arrive over HTTP only");
            Ok(())
        }
    }
}
