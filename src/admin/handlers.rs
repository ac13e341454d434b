use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::error::FailoverError;
use crate::failover::{FailoverEvent, FailoverMetrics, PoolStatus, RecoveryOutcome};
use crate::load_balancer::instance::Instance;
use crate::load_balancer::pool::PoolSnapshot;

pub const MANUAL_FAILURE_REASON: &str = "manual failover via admin api";
const DEFAULT_EVENT_LIMIT: usize = 50;

/// JSON error body for registry errors.
pub struct ApiError(FailoverError);

impl From<FailoverError> for ApiError {
    fn from(err: FailoverError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FailoverError::PoolNotFound { .. } | FailoverError::InstanceNotFound { .. } => StatusCode::NOT_FOUND,
            FailoverError::DuplicateService { .. } | FailoverError::DuplicateInstance { .. } => StatusCode::CONFLICT,
            FailoverError::NoHealthyInstance { .. } | FailoverError::NoReplacementAvailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub pools: usize,
    pub pending_recoveries: usize,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RecoveryResponse {
    pub outcome: RecoveryOutcome,
    pub instance: Instance,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        pools: state.registry.pool_names().len(),
        pending_recoveries: state.registry.pending_recoveries(),
    })
}

pub async fn get_pools(State(state): State<AdminState>) -> Json<Vec<PoolStatus>> {
    let statuses = state
        .registry
        .pool_names()
        .iter()
        .filter_map(|service| state.registry.get_pool_status(service).ok())
        .collect();
    Json(statuses)
}

pub async fn get_pool(
    State(state): State<AdminState>,
    Path(service): Path<String>,
) -> Result<Json<PoolSnapshot>, ApiError> {
    Ok(Json(state.registry.get_pool(&service)?))
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<FailoverMetrics> {
    Json(state.registry.get_failover_metrics())
}

pub async fn get_events(
    State(state): State<AdminState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<FailoverEvent>> {
    Json(state.registry.recent_events(query.limit.unwrap_or(DEFAULT_EVENT_LIMIT)))
}

pub async fn fail_instance(
    State(state): State<AdminState>,
    Path((service, instance)): Path<(String, String)>,
) -> Result<Json<Instance>, ApiError> {
    tracing::info!(service = %service, instance = %instance, "Manual failover requested");
    let replacement = state
        .registry
        .report_failure_with_reason(&service, &instance, MANUAL_FAILURE_REASON)?;
    Ok(Json(replacement))
}

pub async fn recover_instance(
    State(state): State<AdminState>,
    Path((service, instance)): Path<(String, String)>,
) -> Result<Json<RecoveryResponse>, ApiError> {
    tracing::info!(service = %service, instance = %instance, "Manual recovery requested");
    let outcome = state.registry.recover_now(&service, &instance).await?;
    let instance = state.registry.get_instance(&service, &instance)?;
    Ok(Json(RecoveryResponse { outcome, instance }))
}
