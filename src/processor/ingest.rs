use crate::error::{StoreError, ValidationError};
use crate::models::{AlertEvent, FuelLog, Reading, RefinedReportEvent, TheftAlert};
use crate::processor::alerts::{AlertError, AlertLifecycleManager};
use crate::publisher::EventPublisher;
use crate::scorer::{AnomalyScorer, Verdict};
use crate::store::{FuelLogStore, OrgDirectory};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid reading: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to persist fuel log: {0}")]
    Store(#[from] StoreError),
    #[error("failed to raise theft alert: {0}")]
    Alert(#[from] AlertError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub fuel_log: FuelLog,
    pub verdict: Verdict,
    /// Set when the verdict was anomalous.
    pub alert: Option<TheftAlert>,
}

/// Shared by the subscription handler and the HTTP endpoint so both
/// transports behave identically.
#[derive(Clone)]
pub struct IngestGateway {
    fuel_logs: Arc<dyn FuelLogStore>,
    scorer: Arc<dyn AnomalyScorer>,
    alerts: AlertLifecycleManager,
    publisher: EventPublisher,
    directory: Arc<dyn OrgDirectory>,
}

impl IngestGateway {
    pub fn new(
        fuel_logs: Arc<dyn FuelLogStore>,
        scorer: Arc<dyn AnomalyScorer>,
        alerts: AlertLifecycleManager,
        publisher: EventPublisher,
        directory: Arc<dyn OrgDirectory>,
    ) -> Self {
        Self {
            fuel_logs,
            scorer,
            alerts,
            publisher,
            directory,
        }
    }

    pub async fn ingest_payload(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        let reading = Reading::from_slice(payload)?;
        self.ingest(reading).await
    }

    pub async fn ingest(&self, reading: Reading) -> Result<IngestOutcome, IngestError> {
        let fuel_log = self.fuel_logs.append(&reading).await?;
        let verdict = self.scorer.score(&reading);

        info!(
            fuel_log_id = %fuel_log.id,
            vehicle_id = %fuel_log.vehicle_id,
            fuel_level = fuel_log.fuel_level,
            fuel_drop_liters = verdict.fuel_drop_liters,
            anomalous = verdict.is_anomalous,
            "Fuel log recorded"
        );

        let org_id = self.organization_for(&fuel_log.vehicle_id).await;

        let alert = if verdict.is_anomalous {
            let description = format!(
                "Fuel level {:.2} L is {:.2} L below nominal ({} scorer)",
                fuel_log.fuel_level,
                verdict.fuel_drop_liters,
                self.scorer.name()
            );
            let created = self.alerts.create(&fuel_log, &description).await?;
            if created.created {
                self.publisher.publish_alert(&AlertEvent {
                    alert_id: created.alert.id,
                    vehicle_id: created.alert.vehicle_id.clone(),
                    message: format!("Possible theft detected for vehicle {}", created.alert.vehicle_id),
                    timestamp: Utc::now(),
                    driver_id: created.alert.user_id.clone(),
                    org_id: org_id.clone(),
                });
            }
            Some(created.alert)
        } else {
            None
        };

        self.publisher.publish_report(&RefinedReportEvent {
            fuel_log_id: fuel_log.id,
            vehicle_id: fuel_log.vehicle_id.clone(),
            refined_data: verdict.refined.clone(),
            timestamp: Utc::now(),
            org_id,
        });

        Ok(IngestOutcome {
            fuel_log,
            verdict,
            alert,
        })
    }

    async fn organization_for(&self, vehicle_id: &str) -> Option<String> {
        match self.directory.organization_for_vehicle(vehicle_id).await {
            Ok(org) => org,
            Err(e) => {
                warn!(vehicle_id, "Organization lookup failed: {}", e);
                None
            }
        }
    }
}
