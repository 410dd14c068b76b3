use crate::error::StoreError;
use crate::models::{AlertAction, FuelLog, InvalidTransition, NewTheftAlert, TheftAlert};
use crate::store::AlertStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAlert {
    pub alert: TheftAlert,
    /// False when an alert already existed for the fuel log.
    pub created: bool,
}

/// Owns the theft alert state machine.
#[derive(Clone)]
pub struct AlertLifecycleManager {
    store: Arc<dyn AlertStore>,
}

impl AlertLifecycleManager {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// Idempotent per fuel log: repeated calls return the first alert unchanged.
    pub async fn create(&self, fuel_log: &FuelLog, description: &str) -> Result<CreatedAlert, AlertError> {
        let new_alert = NewTheftAlert {
            fuel_log_id: fuel_log.id,
            vehicle_id: fuel_log.vehicle_id.clone(),
            user_id: fuel_log.user_id.clone(),
            description: description.to_string(),
        };

        let (alert, created) = self.store.insert_if_absent(&new_alert).await?;
        if created {
            info!(
                alert_id = %alert.id,
                fuel_log_id = %alert.fuel_log_id,
                vehicle_id = %alert.vehicle_id,
                "Theft alert created"
            );
        } else {
            info!(
                alert_id = %alert.id,
                fuel_log_id = %alert.fuel_log_id,
                "Theft alert already exists for fuel log"
            );
        }
        Ok(CreatedAlert { alert, created })
    }

    pub async fn find(&self, id: Uuid) -> Result<TheftAlert, AlertError> {
        self.store.find(id).await?.ok_or(AlertError::NotFound(id))
    }

    pub async fn transition(&self, id: Uuid, action: AlertAction) -> Result<TheftAlert, AlertError> {
        let current = self.find(id).await?;
        let next = current.status.apply(action)?;

        match self.store.update_status(id, current.status, next).await? {
            Some(updated) => {
                info!(
                    alert_id = %id,
                    from = %current.status,
                    to = %updated.status,
                    "Theft alert {}",
                    action
                );
                Ok(updated)
            }
            None => {
                // Someone else moved it first; judge the action against the new state.
                let latest = self.find(id).await?;
                Err(AlertError::InvalidTransition(InvalidTransition {
                    from: latest.status,
                    action,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertStatus;
    use crate::store::FuelLogStore;
    use crate::test_support::{reading, MemoryStore};

    async fn setup() -> (Arc<MemoryStore>, AlertLifecycleManager, FuelLog) {
        let store = Arc::new(MemoryStore::default());
        let manager = AlertLifecycleManager::new(store.clone());
        let log = store.append(&reading("V1", 5.0)).await.unwrap();
        (store, manager, log)
    }

    #[tokio::test]
    async fn creates_pending_alert() {
        let (store, manager, log) = setup().await;

        let result = manager.create(&log, "Fuel drop of 15.0 L").await.unwrap();
        assert!(result.created);
        assert_eq!(result.alert.status, AlertStatus::Pending);
        assert_eq!(result.alert.fuel_log_id, log.id);
        assert_eq!(result.alert.vehicle_id, "V1");
        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn second_create_returns_existing() {
        let (store, manager, log) = setup().await;

        let first = manager.create(&log, "first").await.unwrap();
        let second = manager.create(&log, "second").await.unwrap();

        assert!(!second.created);
        assert_eq!(second.alert, first.alert);
        assert_eq!(second.alert.description, "first");
        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_store_one_alert() {
        let (store, manager, log) = setup().await;

        let attempts = (0..16).map(|_| {
            let manager = manager.clone();
            let log = log.clone();
            tokio::spawn(async move { manager.create(&log, "retry").await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;

        let created = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|r| r.created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn review_then_approve() {
        let (_, manager, log) = setup().await;
        let alert = manager.create(&log, "drop").await.unwrap().alert;

        let reviewed = manager.transition(alert.id, AlertAction::Review).await.unwrap();
        assert_eq!(reviewed.status, AlertStatus::Reviewed);

        let confirmed = manager.transition(alert.id, AlertAction::Approve).await.unwrap();
        assert_eq!(confirmed.status, AlertStatus::Confirmed);
    }

    #[tokio::test]
    async fn terminal_alert_rejects_changes() {
        let (_, manager, log) = setup().await;
        let alert = manager.create(&log, "drop").await.unwrap().alert;
        manager.transition(alert.id, AlertAction::Reject).await.unwrap();

        let err = manager
            .transition(alert.id, AlertAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AlertError::InvalidTransition(InvalidTransition {
                from: AlertStatus::Dismissed,
                action: AlertAction::Approve
            })
        ));
        assert_eq!(manager.find(alert.id).await.unwrap().status, AlertStatus::Dismissed);
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let (_, manager, _) = setup().await;
        let id = Uuid::new_v4();
        let err = manager.transition(id, AlertAction::Review).await.unwrap_err();
        assert!(matches!(err, AlertError::NotFound(missing) if missing == id));
    }
}
