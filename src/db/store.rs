use crate::db::{queries, DbPool};
use crate::error::StoreError;
use crate::models::{
    AlertStatus, FuelLog, NewNotificationLog, NewTheftAlert, NotificationLog, Reading,
    RefinedReportEvent, TheftAlert,
};
use crate::store::{
    AlertStore, DeadLetterSink, FuelLogStore, NotificationLogStore, OrgDirectory, ReportStore,
};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// Postgres-backed implementation of every store seam.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn alert_from_row(row: &PgRow) -> Result<TheftAlert, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(TheftAlert {
        id: row.try_get("id")?,
        fuel_log_id: row.try_get("fuel_log_id")?,
        vehicle_id: row.try_get("vehicle_id")?,
        user_id: row.try_get("user_id")?,
        status: status.parse::<AlertStatus>().map_err(StoreError::Corrupt)?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl FuelLogStore for PgStore {
    async fn append(&self, reading: &Reading) -> Result<FuelLog, StoreError> {
        let log = sqlx::query_as::<_, FuelLog>(queries::INSERT_FUEL_LOG)
            .bind(Uuid::new_v4())
            .bind(&reading.sensor_id)
            .bind(&reading.vehicle_id)
            .bind(&reading.user_id)
            .bind(reading.fuel_level)
            .bind(reading.latitude)
            .bind(reading.longitude)
            .fetch_one(&self.pool)
            .await?;
        Ok(log)
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_if_absent(&self, alert: &NewTheftAlert) -> Result<(TheftAlert, bool), StoreError> {
        let inserted = sqlx::query(queries::INSERT_THEFT_ALERT_IF_ABSENT)
            .bind(Uuid::new_v4())
            .bind(alert.fuel_log_id)
            .bind(&alert.vehicle_id)
            .bind(&alert.user_id)
            .bind(&alert.description)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((alert_from_row(&row)?, true));
        }

        // Lost the race (or a retry): the unique constraint kept the first row.
        let row = sqlx::query(queries::SELECT_THEFT_ALERT_BY_FUEL_LOG)
            .bind(alert.fuel_log_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((alert_from_row(&row)?, false))
    }

    async fn find(&self, id: Uuid) -> Result<Option<TheftAlert>, StoreError> {
        let row = sqlx::query(queries::SELECT_THEFT_ALERT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(alert_from_row).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        next: AlertStatus,
    ) -> Result<Option<TheftAlert>, StoreError> {
        let row = sqlx::query(queries::UPDATE_THEFT_ALERT_STATUS)
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(alert_from_row).transpose()
    }
}

#[async_trait]
impl NotificationLogStore for PgStore {
    async fn delivered(&self, alert_id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(queries::SELECT_DELIVERED_NOTIFICATION)
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn record_delivery(&self, entry: &NewNotificationLog) -> Result<NotificationLog, StoreError> {
        let inserted = sqlx::query_as::<_, NotificationLog>(queries::INSERT_DELIVERED_NOTIFICATION)
            .bind(Uuid::new_v4())
            .bind(entry.alert_id)
            .bind(&entry.user_id)
            .bind(&entry.message)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(log) => Ok(log),
            None => {
                let existing = sqlx::query_as::<_, NotificationLog>(queries::SELECT_DELIVERED_NOTIFICATION)
                    .bind(entry.alert_id)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(existing)
            }
        }
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn apply(&self, event: &RefinedReportEvent) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(queries::INSERT_REFINED_REPORT)
            .bind(event.fuel_log_id)
            .bind(&event.vehicle_id)
            .bind(&event.org_id)
            .bind(event.refined_data.fuel_level)
            .bind(event.refined_data.fuel_drop_liters)
            .bind(event.refined_data.is_anomalous)
            .bind(&event.refined_data.scorer)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(queries::UPSERT_VEHICLE_FUEL_SUMMARY)
            .bind(&event.vehicle_id)
            .bind(&event.org_id)
            .bind(i64::from(event.refined_data.is_anomalous))
            .bind(event.refined_data.fuel_drop_liters)
            .bind(event.refined_data.fuel_level)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl DeadLetterSink for PgStore {
    async fn record(
        &self,
        queue: &str,
        body: &str,
        reason: &str,
        receive_count: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_DEAD_LETTER)
            .bind(queue)
            .bind(body)
            .bind(reason)
            .bind(receive_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrgDirectory for PgStore {
    async fn organization_for_vehicle(&self, vehicle_id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(queries::SELECT_VEHICLE_ORGANIZATION)
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>("organization_id")?),
            None => Ok(None),
        }
    }
}
