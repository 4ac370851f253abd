//! Read-only statistics views for the CLI and admin API.

use serde::Serialize;

use crate::stats::record::NodeId;
use crate::stats::scorer::rank;
use crate::stats::store::ReliabilityStore;

/// Aggregate view of one (group, service) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub node_count: usize,
    pub total_checks: u64,
    pub overall_success_rate: f64,
    pub best_node: Option<NodeId>,
    pub best_score: Option<f64>,
    pub last_successful_node: Option<NodeId>,
}

/// One row of a reliability ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub node_id: NodeId,
    pub score: f64,
    pub success_rate: f64,
    pub checks: u64,
    pub is_current: bool,
}

/// Summary plus the service it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOverview {
    pub group: String,
    pub service: String,
    #[serde(flatten)]
    pub summary: ServiceSummary,
}

pub fn get_summary(store: &dyn ReliabilityStore, group: &str, service: &str) -> ServiceSummary {
    let stats = store.list_for_service(group, service);

    let total_checks: u64 = stats.values().map(|s| s.total_checks).sum();
    let success_checks: u64 = stats.values().map(|s| s.success_checks).sum();
    let overall_success_rate = if total_checks == 0 {
        0.0
    } else {
        success_checks as f64 / total_checks as f64
    };

    let best = rank(&stats).into_iter().next();

    let last_successful_node = stats
        .iter()
        .filter_map(|(node, s)| s.last_success_at.map(|at| (at, node)))
        // Latest success wins; equal timestamps fall back to the smaller ID.
        .max_by(|(a_at, a_node), (b_at, b_node)| a_at.cmp(b_at).then(b_node.cmp(a_node)))
        .map(|(_, node)| node.clone());

    ServiceSummary {
        node_count: stats.len(),
        total_checks,
        overall_success_rate,
        best_node: best.as_ref().map(|(node, _)| node.clone()),
        best_score: best.map(|(_, score)| score),
        last_successful_node,
    }
}

/// Nodes ordered by descending score. `current` marks the active node, if known.
pub fn get_ranking(
    store: &dyn ReliabilityStore,
    group: &str,
    service: &str,
    current: Option<&str>,
) -> Vec<RankingEntry> {
    let stats = store.list_for_service(group, service);
    rank(&stats)
        .into_iter()
        .map(|(node_id, score)| {
            let stat = &stats[&node_id];
            RankingEntry {
                is_current: current == Some(node_id.as_str()),
                success_rate: stat.success_rate(),
                checks: stat.total_checks,
                score,
                node_id,
            }
        })
        .collect()
}

/// Every service with data, sorted by (group, service).
pub fn list_services(store: &dyn ReliabilityStore) -> Vec<ServiceOverview> {
    store
        .services()
        .into_iter()
        .map(|(group, service)| {
            let summary = get_summary(store, &group, &service);
            ServiceOverview {
                group,
                service,
                summary,
            }
        })
        .collect()
}
