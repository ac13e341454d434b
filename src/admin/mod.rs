//! Admin API.
//!
//! # Routes
//! - `GET  /admin/status`
//! - `GET  /admin/pools`
//! - `GET  /admin/pools/{service}`
//! - `GET  /admin/metrics`
//! - `GET  /admin/events?limit=N`
//! - `POST /admin/pools/{service}/instances/{instance}/fail`
//! - `POST /admin/pools/{service}/instances/{instance}/recover`
//!
//! Every route requires the bearer api key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::failover::FailoverRegistry;

#[derive(Clone)]
pub struct AdminState {
    pub registry: FailoverRegistry,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pools", get(get_pools))
        .route("/admin/pools/{service}", get(get_pool))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/events", get(get_events))
        .route("/admin/pools/{service}/instances/{instance}/fail", post(fail_instance))
        .route("/admin/pools/{service}/instances/{instance}/recover", post(recover_instance))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin router until shutdown is signalled.
pub async fn serve(listener: TcpListener, state: AdminState, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
    tracing::info!(address = ?listener.local_addr().ok(), "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
