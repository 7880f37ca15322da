//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Service identity for operators and a store probe for readiness checks.
//! Both routes sit outside the admin token guard.
use crate::api::error::{ApiError, api_unavailable};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/management/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity and storage backend", body = SystemInfo)
    )
)]
pub(crate) async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(SystemInfo {
        service: "lattice-controlplane".to_string(),
        api_version: state.api_version.clone(),
        storage_backend: state.store.backend_name().to_string(),
        durable_storage: state.store.is_durable(),
        entity_version_required: state.require_entity_version,
    })
}

#[utoipa::path(
    get,
    path = "/api/management/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Store reachable", body = HealthStatus),
        (status = 503, description = "Store unreachable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store.
///
/// # Errors
/// - 503 `unavailable` when the store health check fails.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(|err| api_unavailable("storage unavailable", &err))?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
