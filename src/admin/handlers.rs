use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::scheduler::TaskStatus;
use crate::stats::report::{self, RankingEntry, ServiceOverview, ServiceSummary};
use crate::stats::ReliabilityStore;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tasks: usize,
    pub services: usize,
    pub stats_path: Option<String>,
}

#[derive(Serialize)]
pub struct ServiceStats {
    pub group: String,
    pub service: String,
    pub summary: ServiceSummary,
    pub ranking: Vec<RankingEntry>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        tasks: state.board.snapshot().len(),
        services: state.store.services().len(),
        stats_path: state.store.path().map(|p| p.display().to_string()),
    })
}

pub async fn get_tasks(State(state): State<AdminState>) -> Json<Vec<TaskStatus>> {
    Json(state.board.snapshot())
}

pub async fn get_services(State(state): State<AdminState>) -> Json<Vec<ServiceOverview>> {
    Json(report::list_services(state.store.as_ref()))
}

pub async fn get_service_stats(
    State(state): State<AdminState>,
    Path((group, service)): Path<(String, String)>,
) -> Result<Json<ServiceStats>, StatusCode> {
    let summary = report::get_summary(state.store.as_ref(), &group, &service);
    if summary.node_count == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    // The board knows which node a running task last saw as active.
    let current = state
        .board
        .snapshot()
        .into_iter()
        .find(|t| t.proxy_group_name == group && t.service_name == service)
        .and_then(|t| t.current_node);
    let ranking = report::get_ranking(state.store.as_ref(), &group, &service, current.as_deref());

    Ok(Json(ServiceStats {
        group,
        service,
        summary,
        ranking,
    }))
}

pub async fn clear_stats(State(state): State<AdminState>) -> Result<StatusCode, (StatusCode, String)> {
    state.store.clear_all().map_err(|e| {
        tracing::error!(error = %e, "Failed to clear statistics");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    tracing::warn!("Statistics cleared through admin API");
    Ok(StatusCode::NO_CONTENT)
}
