//! Administrative handlers: breaker visibility and overrides.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::degradation::{DegradationHealthView, ServiceStatus};
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct SetStateRequest {
    pub state: ServiceStatus,
}

#[derive(Deserialize)]
pub struct MaintenanceRequest {
    pub enabled: bool,
}

#[derive(Deserialize, Default)]
pub struct ResetRequest {
    pub service: Option<String>,
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let statuses: BTreeMap<_, _> = state.registry.statuses().into_iter().collect();
    Json(json!({
        "summary": state.registry.health_summary(),
        "breakers": statuses,
    }))
}

pub async fn get_services(State(state): State<AppState>) -> Json<DegradationHealthView> {
    Json(state.degradation.system_health())
}

/// Administrative state override, used for maintenance windows and tests.
pub async fn set_service_state(
    State(state): State<AppState>,
    Path(service): Path<String>,
    Json(request): Json<SetStateRequest>,
) -> Json<serde_json::Value> {
    state.degradation.set_service_state(&service, request.state);
    Json(json!({
        "service": service,
        "state": request.state,
    }))
}

/// Toggle maintenance mode: readiness reports not_ready and alert
/// delivery is muted while enabled.
pub async fn set_maintenance(
    State(state): State<AppState>,
    Json(request): Json<MaintenanceRequest>,
) -> Json<serde_json::Value> {
    state.events.set_muted(request.enabled);
    tracing::info!(enabled = request.enabled, "Maintenance mode toggled");
    Json(json!({ "maintenance_mode": request.enabled }))
}

/// Reset one breaker, or all of them when no service is named.
pub async fn reset_breakers(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Json<serde_json::Value> {
    state.registry.reset(request.service.as_deref());
    Json(json!({
        "reset": request.service.unwrap_or_else(|| "all".to_string()),
    }))
}
