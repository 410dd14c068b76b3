//! Persistence seams used by the pipeline.
//!
//! The Postgres implementations live in [`crate::db`]; tests use the
//! in-memory ones from `test_support`.

use crate::error::StoreError;
use crate::models::{
    AlertStatus, FuelLog, NewNotificationLog, NewTheftAlert, NotificationLog, Reading,
    RefinedReportEvent, TheftAlert,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait FuelLogStore: Send + Sync {
    async fn append(&self, reading: &Reading) -> Result<FuelLog, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Inserts unless an alert already exists for the fuel log.
    /// Returns the stored alert and whether this call created it.
    async fn insert_if_absent(&self, alert: &NewTheftAlert) -> Result<(TheftAlert, bool), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<TheftAlert>, StoreError>;

    /// Compare-and-set on status. `None` when the alert is not in `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        next: AlertStatus,
    ) -> Result<Option<TheftAlert>, StoreError>;
}

#[async_trait]
pub trait NotificationLogStore: Send + Sync {
    async fn delivered(&self, alert_id: Uuid) -> Result<bool, StoreError>;

    /// Records a delivery. A second record for the same alert returns the first.
    async fn record_delivery(&self, entry: &NewNotificationLog) -> Result<NotificationLog, StoreError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Folds the event into the vehicle aggregates. `false` if already applied.
    async fn apply(&self, event: &RefinedReportEvent) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(
        &self,
        queue: &str,
        body: &str,
        reason: &str,
        receive_count: i32,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrgDirectory: Send + Sync {
    async fn organization_for_vehicle(&self, vehicle_id: &str) -> Result<Option<String>, StoreError>;
}
