//! In-memory doubles for the store, queue and notifier seams.

use crate::error::{QueueError, StoreError};
use crate::models::{
    AlertStatus, FuelLog, NewNotificationLog, NewTheftAlert, NotificationLog, Reading,
    RefinedReportEvent, TheftAlert,
};
use crate::notifier::{Notification, Notifier, NotifyError};
use crate::queue::{Queue, QueueMessage};
use crate::store::{
    AlertStore, DeadLetterSink, FuelLogStore, NotificationLogStore, OrgDirectory, ReportStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Consumes one unit of an armed failure counter.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(
            "2025-01-01T00:00:00Z".parse().expect("valid start time"),
        )))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += chrono::Duration::from_std(by).expect("duration in range");
    }
}

struct Entry {
    id: u64,
    body: String,
    receive_count: i32,
    receipt_handle: Option<String>,
    visible_at: DateTime<Utc>,
    enqueued_at: DateTime<Utc>,
}

/// Queue with visibility timeouts driven by a [`ManualClock`].
pub struct MemoryQueue {
    name: String,
    clock: ManualClock,
    entries: Mutex<Vec<Entry>>,
    next_id: Mutex<u64>,
    failing_sends: AtomicU32,
    failing_receives: AtomicU32,
    extensions: AtomicU32,
}

impl MemoryQueue {
    pub fn new(name: &str) -> Self {
        Self::with_clock(name, ManualClock::new())
    }

    pub fn with_clock(name: &str, clock: ManualClock) -> Self {
        Self {
            name: name.to_string(),
            clock,
            entries: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            failing_sends: AtomicU32::new(0),
            failing_receives: AtomicU32::new(0),
            extensions: AtomicU32::new(0),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("queue lock").len()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("queue lock")
            .iter()
            .map(|e| e.body.clone())
            .collect()
    }

    pub fn fail_next_sends(&self, n: u32) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_receives(&self, n: u32) {
        self.failing_receives.store(n, Ordering::SeqCst);
    }

    pub fn visibility_extensions(&self) -> u32 {
        self.extensions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, body: &str) -> Result<String, QueueError> {
        if take_failure(&self.failing_sends) {
            return Err(QueueError::Unavailable("broker unreachable".to_string()));
        }
        let id = {
            let mut next = self.next_id.lock().expect("id lock");
            let id = *next;
            *next += 1;
            id
        };
        let now = self.clock.now();
        self.entries.lock().expect("queue lock").push(Entry {
            id,
            body: body.to_string(),
            receive_count: 0,
            receipt_handle: None,
            visible_at: now,
            enqueued_at: now,
        });
        Ok(id.to_string())
    }

    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        if take_failure(&self.failing_receives) {
            return Err(QueueError::Unavailable("broker unreachable".to_string()));
        }
        let messages = {
            let now = self.clock.now();
            let hidden_until = now + chrono::Duration::from_std(visibility_timeout).expect("range");
            let mut entries = self.entries.lock().expect("queue lock");
            entries
                .iter_mut()
                .filter(|e| e.visible_at <= now)
                .take(max_messages as usize)
                .map(|e| {
                    let receipt = Uuid::new_v4().to_string();
                    e.receive_count += 1;
                    e.visible_at = hidden_until;
                    e.receipt_handle = Some(receipt.clone());
                    QueueMessage {
                        message_id: e.id.to_string(),
                        receipt_handle: receipt,
                        body: e.body.clone(),
                        receive_count: e.receive_count,
                        enqueued_at: e.enqueued_at,
                    }
                })
                .collect::<Vec<_>>()
        };

        if messages.is_empty() && !wait.is_zero() {
            // The manual clock never moves on its own; just yield briefly.
            tokio::time::sleep(wait.min(Duration::from_millis(5))).await;
        }
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.entries
            .lock()
            .expect("queue lock")
            .retain(|e| e.receipt_handle.as_deref() != Some(receipt_handle));
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt_handle: &str,
        visibility_timeout: Duration,
    ) -> Result<(), QueueError> {
        let hidden_until =
            self.clock.now() + chrono::Duration::from_std(visibility_timeout).expect("range");
        let mut entries = self.entries.lock().expect("queue lock");
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.receipt_handle.as_deref() == Some(receipt_handle))
        {
            entry.visible_at = hidden_until;
            self.extensions.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub queue: String,
    pub body: String,
    pub reason: String,
    pub receive_count: i32,
}

#[derive(Default)]
pub struct MemoryDeadLetters {
    entries: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetters {
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries.lock().expect("dead letter lock").clone()
    }
}

#[async_trait]
impl DeadLetterSink for MemoryDeadLetters {
    async fn record(
        &self,
        queue: &str,
        body: &str,
        reason: &str,
        receive_count: i32,
    ) -> Result<(), StoreError> {
        self.entries.lock().expect("dead letter lock").push(DeadLetter {
            queue: queue.to_string(),
            body: body.to_string(),
            reason: reason.to_string(),
            receive_count,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSummary {
    pub readings_count: i64,
    pub anomalies_count: i64,
    pub total_drop_liters: f64,
}

/// Single in-memory store backing every persistence seam.
#[derive(Default)]
pub struct MemoryStore {
    fuel_logs: Mutex<Vec<FuelLog>>,
    alerts: Mutex<Vec<TheftAlert>>,
    notifications: Mutex<Vec<NotificationLog>>,
    reports: Mutex<HashMap<Uuid, RefinedReportEvent>>,
    summaries: Mutex<HashMap<String, VehicleSummary>>,
    organizations: Mutex<HashMap<String, String>>,
    failing_appends: AtomicBool,
    failing_report_applies: AtomicU32,
    failing_deliveries: AtomicU32,
}

impl MemoryStore {
    pub fn fuel_logs(&self) -> Vec<FuelLog> {
        self.fuel_logs.lock().expect("store lock").clone()
    }

    pub fn alerts(&self) -> Vec<TheftAlert> {
        self.alerts.lock().expect("store lock").clone()
    }

    pub fn notifications(&self) -> Vec<NotificationLog> {
        self.notifications.lock().expect("store lock").clone()
    }

    pub fn summary(&self, vehicle_id: &str) -> Option<VehicleSummary> {
        self.summaries.lock().expect("store lock").get(vehicle_id).cloned()
    }

    pub fn register_vehicle(&self, vehicle_id: &str, org_id: &str) {
        self.organizations
            .lock()
            .expect("store lock")
            .insert(vehicle_id.to_string(), org_id.to_string());
    }

    pub fn fail_appends(&self, fail: bool) {
        self.failing_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_report_applies(&self, n: u32) {
        self.failing_report_applies.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_deliveries(&self, n: u32) {
        self.failing_deliveries.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl FuelLogStore for MemoryStore {
    async fn append(&self, reading: &Reading) -> Result<FuelLog, StoreError> {
        if self.failing_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database unreachable".to_string()));
        }
        let log = FuelLog {
            id: Uuid::new_v4(),
            sensor_id: reading.sensor_id.clone(),
            vehicle_id: reading.vehicle_id.clone(),
            user_id: reading.user_id.clone(),
            fuel_level: reading.fuel_level,
            latitude: reading.latitude,
            longitude: reading.longitude,
            recorded_at: Utc::now(),
        };
        self.fuel_logs.lock().expect("store lock").push(log.clone());
        Ok(log)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_if_absent(&self, alert: &NewTheftAlert) -> Result<(TheftAlert, bool), StoreError> {
        let mut alerts = self.alerts.lock().expect("store lock");
        if let Some(existing) = alerts.iter().find(|a| a.fuel_log_id == alert.fuel_log_id) {
            return Ok((existing.clone(), false));
        }
        let created = TheftAlert {
            id: Uuid::new_v4(),
            fuel_log_id: alert.fuel_log_id,
            vehicle_id: alert.vehicle_id.clone(),
            user_id: alert.user_id.clone(),
            status: AlertStatus::Pending,
            description: alert.description.clone(),
            created_at: Utc::now(),
        };
        alerts.push(created.clone());
        Ok((created, true))
    }

    async fn find(&self, id: Uuid) -> Result<Option<TheftAlert>, StoreError> {
        let alerts = self.alerts.lock().expect("store lock");
        Ok(alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        next: AlertStatus,
    ) -> Result<Option<TheftAlert>, StoreError> {
        let mut alerts = self.alerts.lock().expect("store lock");
        match alerts.iter_mut().find(|a| a.id == id && a.status == expected) {
            Some(alert) => {
                alert.status = next;
                Ok(Some(alert.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl NotificationLogStore for MemoryStore {
    async fn delivered(&self, alert_id: Uuid) -> Result<bool, StoreError> {
        let logs = self.notifications.lock().expect("store lock");
        Ok(logs.iter().any(|l| l.alert_id == Some(alert_id)))
    }

    async fn record_delivery(&self, entry: &NewNotificationLog) -> Result<NotificationLog, StoreError> {
        if take_failure(&self.failing_deliveries) {
            return Err(StoreError::Unavailable("database unreachable".to_string()));
        }
        let mut logs = self.notifications.lock().expect("store lock");
        if let Some(existing) = logs.iter().find(|l| l.alert_id == Some(entry.alert_id)) {
            return Ok(existing.clone());
        }
        let log = NotificationLog {
            id: Uuid::new_v4(),
            alert_id: Some(entry.alert_id),
            user_id: entry.user_id.clone(),
            message: entry.message.clone(),
            status: crate::models::notification_log::STATUS_DELIVERED.to_string(),
            created_at: Utc::now(),
        };
        logs.push(log.clone());
        Ok(log)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn apply(&self, event: &RefinedReportEvent) -> Result<bool, StoreError> {
        if take_failure(&self.failing_report_applies) {
            return Err(StoreError::Unavailable("database unreachable".to_string()));
        }
        let mut reports = self.reports.lock().expect("store lock");
        if reports.contains_key(&event.fuel_log_id) {
            return Ok(false);
        }
        reports.insert(event.fuel_log_id, event.clone());

        let mut summaries = self.summaries.lock().expect("store lock");
        let summary = summaries.entry(event.vehicle_id.clone()).or_default();
        summary.readings_count += 1;
        summary.anomalies_count += i64::from(event.refined_data.is_anomalous);
        summary.total_drop_liters += event.refined_data.fuel_drop_liters;
        Ok(true)
    }
}

#[async_trait]
impl OrgDirectory for MemoryStore {
    async fn organization_for_vehicle(&self, vehicle_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .organizations
            .lock()
            .expect("store lock")
            .get(vehicle_id)
            .cloned())
    }
}

/// Notifier that fails a scripted number of times, then records every send.
#[derive(Default)]
pub struct ScriptedNotifier {
    failures_left: AtomicU32,
    attempts: AtomicU32,
    sent: Mutex<Vec<Notification>>,
}

impl ScriptedNotifier {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier lock").clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.failures_left) {
            return Err(NotifyError::Rejected(503));
        }
        self.sent.lock().expect("notifier lock").push(notification.clone());
        Ok(())
    }
}

pub fn reading(vehicle_id: &str, fuel_level: f64) -> Reading {
    Reading {
        sensor_id: format!("S-{vehicle_id}"),
        vehicle_id: vehicle_id.to_string(),
        user_id: format!("U-{vehicle_id}"),
        fuel_level,
        latitude: 0.0,
        longitude: 0.0,
    }
}
