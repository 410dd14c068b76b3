use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Reviewed,
    Confirmed,
    Dismissed,
}

/// Operator actions that move an alert through its review states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    /// A manager has looked at the alert.
    Review,
    Approve,
    Acknowledge,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} an alert in state {from}")]
pub struct InvalidTransition {
    pub from: AlertStatus,
    pub action: AlertAction,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "PENDING",
            AlertStatus::Reviewed => "REVIEWED",
            AlertStatus::Confirmed => "CONFIRMED",
            AlertStatus::Dismissed => "DISMISSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Confirmed | AlertStatus::Dismissed)
    }

    pub fn apply(self, action: AlertAction) -> Result<AlertStatus, InvalidTransition> {
        use AlertAction::*;
        use AlertStatus::*;

        if self.is_terminal() {
            return Err(InvalidTransition { from: self, action });
        }
        match (self, action) {
            (Pending, Review) => Ok(Reviewed),
            (Pending, Approve) | (Pending, Acknowledge) => Ok(Confirmed),
            (Reviewed, Approve) => Ok(Confirmed),
            (Pending, Reject) | (Reviewed, Reject) => Ok(Dismissed),
            (from, action) => Err(InvalidTransition { from, action }),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AlertStatus::Pending),
            "REVIEWED" => Ok(AlertStatus::Reviewed),
            "CONFIRMED" => Ok(AlertStatus::Confirmed),
            "DISMISSED" => Ok(AlertStatus::Dismissed),
            other => Err(format!("unknown alert status `{other}`")),
        }
    }
}

impl fmt::Display for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertAction::Review => "review",
            AlertAction::Approve => "approve",
            AlertAction::Acknowledge => "acknowledge",
            AlertAction::Reject => "reject",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheftAlert {
    pub id: Uuid,
    pub fuel_log_id: Uuid,
    pub vehicle_id: String,
    pub user_id: String,
    pub status: AlertStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTheftAlert {
    pub fuel_log_id: Uuid,
    pub vehicle_id: String,
    pub user_id: String,
    pub description: String,
}
