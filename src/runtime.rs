use crate::api::{self, ApiState};
use crate::config::AppConfig;
use crate::consumer::{ConsumerLoop, ConsumerSettings, NotificationHandler, ReportHandler};
use crate::db::{DbPool, PgStore};
use crate::notifier::HttpMailRelay;
use crate::processor::alerts::AlertLifecycleManager;
use crate::processor::ingest::IngestGateway;
use crate::processor::subscription;
use crate::publisher::{EventPublisher, RetryPolicy};
use crate::queue::PgQueue;
use crate::scorer;
use crate::transport;
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Starts every enabled role and blocks until Ctrl+C has been handled.
pub async fn run(config: AppConfig, pool: DbPool) -> anyhow::Result<()> {
    let store = Arc::new(PgStore::new(pool.clone()));
    let alert_queue = Arc::new(PgQueue::new(pool.clone(), &config.alert_queue));
    let report_queue = Arc::new(PgQueue::new(pool, &config.report_queue));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        signal_token.cancel();
    });

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut publisher = None;

    if config.roles.ingest {
        let events = EventPublisher::new(
            alert_queue.clone(),
            report_queue.clone(),
            store.clone(),
            RetryPolicy::from_config(&config),
        );
        let alerts = AlertLifecycleManager::new(store.clone());
        let gateway = IngestGateway::new(
            store.clone(),
            scorer::from_config(&config),
            alerts.clone(),
            events.clone(),
            store.clone(),
        );
        publisher = Some(events);

        let (inbound_tx, inbound_rx) = mpsc::channel(config.ingest_channel_capacity.max(1));

        let token = shutdown.clone();
        let handler_gateway = gateway.clone();
        tasks.push(tokio::spawn(async move {
            let stats = subscription::run(inbound_rx, handler_gateway, token).await;
            info!(
                accepted = stats.accepted,
                dropped = stats.dropped,
                "Subscription handler finished"
            );
        }));

        let token = shutdown.clone();
        let transport_config = config.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = transport::run(transport_config, inbound_tx, token).await {
                error!("Telemetry transport failed: {:#}", e);
            }
        }));

        let listener = tokio::net::TcpListener::bind(&config.http_bind)
            .await
            .with_context(|| format!("failed to bind {}", config.http_bind))?;
        info!("HTTP listening on {}", config.http_bind);
        let app = api::routes(ApiState { gateway, alerts });
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!("HTTP server failed: {}", e);
            }
        }));
    }

    if config.roles.notifier {
        let relay = HttpMailRelay::new(&config)?;
        let handler = NotificationHandler::new(
            Arc::new(relay),
            store.clone(),
            config.mail_from.clone(),
            config.alert_email_to.clone(),
        );
        let consumer = ConsumerLoop::new(
            alert_queue.clone(),
            handler,
            store.clone(),
            ConsumerSettings::from_config(&config),
        );
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move { consumer.run(token).await }));
    }

    if config.roles.reporter {
        let consumer = ConsumerLoop::new(
            report_queue.clone(),
            ReportHandler::new(store.clone()),
            store.clone(),
            ConsumerSettings::from_config(&config),
        );
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move { consumer.run(token).await }));
    }

    info!("{} pipeline tasks running", tasks.len());

    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            error!("Pipeline task panicked: {}", e);
        }
    }

    if let Some(publisher) = publisher {
        info!("Waiting for in-flight publishes");
        publisher.flush().await;
    }

    info!("Shutdown complete");
    Ok(())
}
