use crate::config::AppConfig;
use crate::processor::subscription::InboundMessage;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn start_mqtt_client(
    config: &AppConfig,
    inbound: mpsc::Sender<InboundMessage>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let client_id = format!("petroshield-ingest-{}", Uuid::new_v4());
    let mut mqttoptions = MqttOptions::new(client_id, &config.mqtt_broker, config.mqtt_port);
    mqttoptions.set_keep_alive(Duration::from_secs(5));
    if !config.mqtt_username.is_empty() {
        mqttoptions.set_credentials(&config.mqtt_username, &config.mqtt_password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);

    client.subscribe(&config.mqtt_topic, QoS::AtLeastOnce).await?;
    info!("Subscribed to {}", config.mqtt_topic);

    loop {
        let notification = tokio::select! {
            _ = shutdown.cancelled() => break,
            n = eventloop.poll() => n,
        };

        match notification {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = InboundMessage {
                    source: "mqtt",
                    payload: publish.payload.to_vec(),
                };
                // Bounded channel: a slow gateway holds back the broker.
                if inbound.send(message).await.is_err() {
                    warn!("Subscription handler gone, stopping MQTT client");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT Connected!");
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                info!("Subscription confirmed!");
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT Connection error: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }

    if let Err(e) = client.try_disconnect() {
        warn!("MQTT disconnect failed: {}", e);
    }
    info!("MQTT client stopped");
    Ok(())
}
