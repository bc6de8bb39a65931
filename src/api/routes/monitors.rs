//! Monitor endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{MonitorInfo, MonitorsResponse, RegisterResponse},
};
use crate::config::MonitorDefinition;
use crate::monitor::MonitorId;

/// GET /api/v1/monitors
pub async fn list_monitors(State(state): State<ApiState>) -> Json<MonitorsResponse> {
    let monitors: Vec<MonitorInfo> = state
        .supervisor
        .list()
        .iter()
        .map(|monitor| MonitorInfo::from(monitor.as_ref()))
        .collect();

    Json(MonitorsResponse {
        count: monitors.len(),
        monitors,
    })
}

/// POST /api/v1/monitors
///
/// Builds the monitor from the definition in the body, registers and starts
/// it. A monitor whose actions fail to init is still registered (stopped).
pub async fn register_monitor(
    State(state): State<ApiState>,
    payload: Result<Json<MonitorDefinition>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(def) = payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;

    let monitor = state.supervisor.register(&def).await?;
    let id = monitor.id().ok_or_else(|| {
        ApiError::Internal(format!("monitor {} has no id after registration", def.name))
    })?;

    info!("registered monitor {id} ({}) via API", def.name);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id,
            name: def.name,
        }),
    ))
}

/// GET /api/v1/monitors/:id
pub async fn get_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> ApiResult<Json<MonitorInfo>> {
    let monitor = state.supervisor.find(id)?;
    Ok(Json(MonitorInfo::from(monitor.as_ref())))
}

/// POST /api/v1/monitors/:id/start
pub async fn start_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> ApiResult<Json<MonitorInfo>> {
    let monitor = state.supervisor.start(id).await?;
    Ok(Json(MonitorInfo::from(monitor.as_ref())))
}

/// POST /api/v1/monitors/:id/stop
pub async fn stop_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> ApiResult<Json<MonitorInfo>> {
    let monitor = state.supervisor.stop(id).await?;
    Ok(Json(MonitorInfo::from(monitor.as_ref())))
}

/// DELETE /api/v1/monitors/:id
pub async fn unregister_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> ApiResult<StatusCode> {
    state.supervisor.unregister(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
