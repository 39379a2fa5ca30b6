//! Operational HTTP server.
//!
//! # Responsibilities
//! - Create Axum Router with the health and admin handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown signal fires
//!
//! # Endpoints
//! - `GET  /health/live` — liveness, public
//! - `GET  /health/ready` — readiness, public
//! - `GET  /health` — full snapshot for authenticated callers, bare
//!   status otherwise
//! - `POST /health/check` — forced re-evaluation, authenticated
//! - `/admin/*` — see the admin module, authenticated

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header::HeaderValue, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::admin;
use crate::admin::auth::bearer_authorized;
use crate::degradation::GracefulDegradationService;
use crate::events::EventBus;
use crate::health::HealthMonitorService;
use crate::resilience::CircuitBreakerRegistry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<HealthMonitorService>,
    pub degradation: Arc<GracefulDegradationService>,
    pub registry: Arc<CircuitBreakerRegistry>,
    pub events: EventBus,
    pub maintenance: Arc<AtomicBool>,
    pub api_key: String,
}

#[derive(Clone, Copy)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// HTTP server for the operational surface.
pub struct OpsServer {
    router: Router,
}

impl OpsServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/health", get(health_handler))
            .route("/health/check", post(forced_check_handler))
            .with_state(state.clone())
            .merge(admin::setup_admin_router(state))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Ops server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Ops server received shutdown signal");
            })
            .await?;

        tracing::info!("Ops server stopped");
        Ok(())
    }
}

async fn liveness_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.liveness())
}

async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let readiness = state.monitor.readiness();
    let code = if readiness.status == "ready" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness))
}

/// Full snapshot for authenticated callers; unauthenticated callers get
/// only the overall status with no service-level detail.
async fn health_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let snapshot = state.monitor.system_health();
    if bearer_authorized(&headers, &state.api_key) {
        Json((*snapshot).clone()).into_response()
    } else {
        Json(json!({
            "status": snapshot.overall,
            "timestamp": snapshot.timestamp,
        }))
        .into_response()
    }
}

async fn forced_check_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !bearer_authorized(&headers, &state.api_key) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let result = state.monitor.force_health_check().await;
    Json(result).into_response()
}
