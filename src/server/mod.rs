//! HTTP/WebSocket surface (C11): axum router wiring every endpoint in spec
//! §6's table onto the shared [`Runtime`].

pub mod auth;
pub mod handlers;
pub mod rate_limit;
pub mod ws;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::runtime::Runtime;
use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
    pub limiter: RateLimiter,
}

impl FromRef<AppState> for Arc<Runtime> {
    fn from_ref(state: &AppState) -> Self {
        state.runtime.clone()
    }
}

impl FromRef<AppState> for RateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.limiter.clone()
    }
}

/// Build the full router. `runtime` is wrapped once here and shared by every
/// handler and middleware layer through `AppState`.
pub fn build_router(runtime: Arc<Runtime>) -> Router {
    let state = AppState {
        runtime,
        limiter: RateLimiter::new(),
    };

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/goblins", get(handlers::list_goblins))
        .route("/api/execute", post(handlers::execute))
        .route("/api/history/{agent}", get(handlers::history))
        .route("/api/stats/{agent}", get(handlers::stats))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/orchestrate/parse", post(handlers::orchestrate_parse))
        .route("/api/orchestrate/execute", post(handlers::orchestrate_execute))
        .route("/api/orchestrate/plans", get(handlers::list_plans))
        .route("/api/orchestrate/plans/{id}", get(handlers::get_plan))
        .route("/api/orchestrate/cancel/{id}", post(handlers::cancel_plan))
        .route("/api/costs/summary", get(handlers::cost_summary))
        .route("/api/costs/goblin/{id}", get(handlers::cost_for_goblin))
        .route("/api/costs/guild/{id}", get(handlers::cost_for_guild))
        .route("/api/costs/export", get(handlers::cost_export))
        .route("/ws", get(ws::upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .with_state(state)
}
