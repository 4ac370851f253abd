//! Admin HTTP API over live task status and statistics.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::Shutdown;
use crate::scheduler::TaskBoard;
use crate::stats::StatStore;

#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<StatStore>,
    pub board: TaskBoard,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/tasks", get(get_tasks))
        .route("/admin/services", get(get_services))
        .route("/admin/stats/{group}/{service}", get(get_service_stats))
        .route("/admin/stats", delete(clear_stats))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown is requested.
pub async fn serve(listener: TcpListener, state: AdminState, shutdown: Shutdown) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(address = %addr, "Admin API listening");
    }
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
