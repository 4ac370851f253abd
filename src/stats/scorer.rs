//! Reliability scoring.
//!
//! The score shrinks a node's observed success rate toward a neutral prior
//! so a handful of lucky probes cannot outrank a long, good record, then
//! decays it geometrically for each failure in the current losing streak:
//!
//! ```text
//! total == 0 → NEUTRAL_PRIOR
//! shrunk     = (success + PRIOR_WEIGHT · NEUTRAL_PRIOR) / (total + PRIOR_WEIGHT)
//! score      = shrunk · FAILURE_DECAY ^ consecutive_failures
//! ```
//!
//! Holding everything else fixed, the score never drops when `success`
//! grows and never rises when `consecutive_failures` grows.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::stats::record::{NodeId, NodeStat};

/// Score of a node that has never been probed.
pub const NEUTRAL_PRIOR: f64 = 0.5;

/// Pseudo-observations backing the prior.
pub const PRIOR_WEIGHT: f64 = 2.0;

/// Multiplier applied per consecutive failure.
pub const FAILURE_DECAY: f64 = 0.85;

/// Reliability score in `[0.0, 1.0]`.
pub fn score(stat: &NodeStat) -> f64 {
    if stat.total_checks == 0 {
        return NEUTRAL_PRIOR;
    }

    let total = stat.total_checks as f64;
    let success = stat.success_checks.min(stat.total_checks) as f64;
    let shrunk = (success + PRIOR_WEIGHT * NEUTRAL_PRIOR) / (total + PRIOR_WEIGHT);

    let streak = i32::try_from(stat.consecutive_failures).unwrap_or(i32::MAX);
    let penalty = FAILURE_DECAY.powi(streak);

    (shrunk * penalty).clamp(0.0, 1.0)
}

/// Score for an optional stat; unseen nodes get the neutral prior.
pub fn score_or_prior(stat: Option<&NodeStat>) -> f64 {
    stat.map(score).unwrap_or(NEUTRAL_PRIOR)
}

/// Rank nodes by descending score, ties broken by node ID.
pub fn rank(stats: &HashMap<NodeId, NodeStat>) -> Vec<(NodeId, f64)> {
    let mut ranked: Vec<(NodeId, f64)> = stats
        .iter()
        .map(|(node, stat)| (node.clone(), score(stat)))
        .collect();
    sort_ranked(&mut ranked);
    ranked
}

/// Rank an explicit candidate list, scoring nodes without history at the prior.
pub fn rank_candidates(
    candidates: &[NodeId],
    stats: &HashMap<NodeId, NodeStat>,
) -> Vec<(NodeId, f64)> {
    let mut ranked: Vec<(NodeId, f64)> = candidates
        .iter()
        .map(|node| (node.clone(), score_or_prior(stats.get(node))))
        .collect();
    sort_ranked(&mut ranked);
    ranked.dedup_by(|a, b| a.0 == b.0);
    ranked
}

fn sort_ranked(ranked: &mut [(NodeId, f64)]) {
    ranked.sort_by(|(a_node, a_score), (b_node, b_score)| {
        match b_score.total_cmp(a_score) {
            Ordering::Equal => a_node.cmp(b_node),
            other => other,
        }
    });
}
