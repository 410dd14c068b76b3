use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue message announcing a newly created theft alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub alert_id: Uuid,
    pub vehicle_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub driver_id: String,
    pub org_id: Option<String>,
}

/// Scorer output that travels with every report event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedData {
    pub fuel_level: f64,
    pub fuel_drop_liters: f64,
    pub is_anomalous: bool,
    pub scorer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedReportEvent {
    pub fuel_log_id: Uuid,
    pub vehicle_id: String,
    pub refined_data: RefinedData,
    pub timestamp: DateTime<Utc>,
    pub org_id: Option<String>,
}
