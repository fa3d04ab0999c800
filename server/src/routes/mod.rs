//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The service exposes the `/api/me` hook next to the backend and a health
//! check. Both live under one Axum router with permissive CORS, since the
//! browser client is served from a different origin.

pub mod me;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/me", get(me::me))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
