//! HTTP surface of the ingest role.
//!
//! - POST /fuel-logs - direct telemetry ingestion, same body as the broker payload
//! - POST /alerts/:id/{review,approve,acknowledge,reject} - alert review workflow
//! - GET /health - liveness

use crate::models::{AlertAction, TheftAlert};
use crate::processor::alerts::{AlertError, AlertLifecycleManager};
use crate::processor::ingest::{IngestError, IngestGateway};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    pub gateway: IngestGateway,
    pub alerts: AlertLifecycleManager,
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fuel-logs", post(create_fuel_log))
        .route("/alerts/:id/review", post(review_alert))
        .route("/alerts/:id/approve", post(approve_alert))
        .route("/alerts/:id/acknowledge", post(acknowledge_alert))
        .route("/alerts/:id/reject", post(reject_alert))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub message: String,
    pub is_theft: bool,
    pub fuel_drop_liters: f64,
    pub fuel_log_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<Uuid>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_fuel_log(State(state): State<ApiState>, body: Bytes) -> Response {
    match state.gateway.ingest_payload(&body).await {
        Ok(outcome) => Json(IngestResponse {
            message: if outcome.verdict.is_anomalous {
                format!("Possible theft detected for vehicle {}", outcome.fuel_log.vehicle_id)
            } else {
                "Fuel log recorded".to_string()
            },
            is_theft: outcome.verdict.is_anomalous,
            fuel_drop_liters: outcome.verdict.fuel_drop_liters,
            fuel_log_id: outcome.fuel_log.id,
            alert_id: outcome.alert.map(|a| a.id),
        })
        .into_response(),
        Err(IngestError::Validation(e)) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!("Fuel log ingestion failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn review_alert(state: State<ApiState>, id: Path<String>) -> Response {
    transition(state, id, AlertAction::Review).await
}

async fn approve_alert(state: State<ApiState>, id: Path<String>) -> Response {
    transition(state, id, AlertAction::Approve).await
}

async fn acknowledge_alert(state: State<ApiState>, id: Path<String>) -> Response {
    transition(state, id, AlertAction::Acknowledge).await
}

async fn reject_alert(state: State<ApiState>, id: Path<String>) -> Response {
    transition(state, id, AlertAction::Reject).await
}

async fn transition(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    action: AlertAction,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid alert id `{id}`"));
    };

    match state.alerts.transition(id, action).await {
        Ok(alert) => Json::<TheftAlert>(alert).into_response(),
        Err(e @ AlertError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ AlertError::InvalidTransition(_)) => error_response(StatusCode::CONFLICT, e.to_string()),
        Err(e @ AlertError::Store(_)) => {
            error!(alert_id = %id, "Alert {} failed: {}", action, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
