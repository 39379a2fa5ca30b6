//! Authenticated administrative surface.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/reset", post(reset_breakers))
        .route("/admin/services", get(get_services))
        .route("/admin/services/{service}/state", post(set_service_state))
        .route("/admin/maintenance", post(set_maintenance))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
