//! Per-node probe counters.

use serde::{Deserialize, Serialize};

/// Proxy node identifier as reported by the controller.
pub type NodeId = String;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Identity of a NodeStat: (proxy group, service, node).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatKey {
    pub group: String,
    pub service: String,
    pub node: NodeId,
}

impl StatKey {
    pub fn new(group: &str, service: &str, node: &str) -> Self {
        Self {
            group: group.to_string(),
            service: service.to_string(),
            node: node.to_string(),
        }
    }

    /// True if this key belongs to the given (group, service) pair.
    pub fn is_for(&self, group: &str, service: &str) -> bool {
        self.group == group && self.service == service
    }
}

/// Probe history of one node for one service.
///
/// Invariant: `success_checks <= total_checks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStat {
    pub total_checks: u64,
    pub success_checks: u64,
    pub consecutive_failures: u64,
    pub last_checked_at: Timestamp,
    pub last_success_at: Option<Timestamp>,
}

impl NodeStat {
    /// A stat that has never been observed.
    pub fn empty(at: Timestamp) -> Self {
        Self {
            total_checks: 0,
            success_checks: 0,
            consecutive_failures: 0,
            last_checked_at: at,
            last_success_at: None,
        }
    }

    /// Fold one probe result into the counters.
    pub fn observe(&mut self, success: bool, at: Timestamp) {
        self.total_checks = self.total_checks.saturating_add(1);
        if success {
            self.success_checks = self.success_checks.saturating_add(1).min(self.total_checks);
            self.consecutive_failures = 0;
            self.last_success_at = Some(at);
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        self.last_checked_at = at;
    }

    /// Fraction of successful probes, 0.0 when never checked.
    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.success_checks as f64 / self.total_checks as f64
        }
    }

    /// Restore the counter invariant on data loaded from disk.
    /// Returns true if anything had to change.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;
        if self.success_checks > self.total_checks {
            self.success_checks = self.total_checks;
            changed = true;
        }
        let max_failures = self.total_checks - self.success_checks;
        if self.consecutive_failures > max_failures {
            self.consecutive_failures = max_failures;
            changed = true;
        }
        changed
    }
}
