use crate::processor::ingest::{IngestError, IngestGateway};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A raw payload delivered by a telemetry transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub source: &'static str,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub accepted: u64,
    pub dropped: u64,
}

/// Drains the inbound channel into the gateway.
///
/// Delivery from the broker is at-most-once here: a payload that fails
/// validation or persistence is logged and dropped. Sensors resend on their
/// own cadence.
pub async fn run(
    mut inbound: mpsc::Receiver<InboundMessage>,
    gateway: IngestGateway,
    shutdown: CancellationToken,
) -> SubscriptionStats {
    let mut stats = SubscriptionStats::default();

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Subscription handler stopping");
                break;
            }
            message = inbound.recv() => match message {
                Some(m) => m,
                None => {
                    info!("Telemetry channel closed");
                    break;
                }
            },
        };

        match gateway.ingest_payload(&message.payload).await {
            Ok(outcome) => {
                stats.accepted += 1;
                debug!(
                    source = message.source,
                    fuel_log_id = %outcome.fuel_log.id,
                    "Telemetry message ingested"
                );
            }
            Err(IngestError::Validation(e)) => {
                stats.dropped += 1;
                warn!(source = message.source, "Dropping malformed telemetry message: {}", e);
            }
            Err(e) => {
                stats.dropped += 1;
                error!(source = message.source, "Failed to ingest telemetry message: {}", e);
            }
        }
    }

    stats
}
