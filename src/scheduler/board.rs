//! Live per-task status, shared with the admin API.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::engine::{EnginePhase, TaskState, TickOutcome, TickReport};
use crate::stats::{NodeId, Timestamp};

/// Latest known status of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub name: String,
    pub proxy_group_name: String,
    pub service_name: String,
    pub enabled: bool,
    pub phase: EnginePhase,
    pub current_node: Option<NodeId>,
    pub consecutive_rotations: u32,
    pub last_outcome: Option<TickOutcome>,
    pub last_tick_at: Option<Timestamp>,
    pub ticks: u64,
    pub healthy_seen: bool,
}

impl TaskStatus {
    fn from_state(state: &TaskState) -> Self {
        Self {
            name: state.name.clone(),
            proxy_group_name: state.proxy_group_name.clone(),
            service_name: state.service_name.clone(),
            enabled: state.enabled,
            phase: state.phase,
            current_node: None,
            consecutive_rotations: state.consecutive_rotations,
            last_outcome: None,
            last_tick_at: None,
            ticks: 0,
            healthy_seen: false,
        }
    }
}

/// Concurrent map of task name to status.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    tasks: Arc<DashMap<String, TaskStatus>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, state: &TaskState) {
        self.tasks
            .insert(state.name.clone(), TaskStatus::from_state(state));
    }

    /// Fold a finished tick into the task's status.
    pub fn update(&self, state: &TaskState, report: &TickReport, at: Timestamp) {
        let mut entry = self
            .tasks
            .entry(state.name.clone())
            .or_insert_with(|| TaskStatus::from_state(state));
        let status = entry.value_mut();
        status.phase = state.phase;
        status.consecutive_rotations = state.consecutive_rotations;
        if let Some(node) = report.outcome.node() {
            status.current_node = Some(node.to_string());
        }
        status.healthy_seen |= report.outcome.is_healthy();
        status.last_outcome = Some(report.outcome.clone());
        status.last_tick_at = Some(at);
        status.ticks += 1;
    }

    pub fn get(&self, name: &str) -> Option<TaskStatus> {
        self.tasks.get(name).map(|s| s.value().clone())
    }

    /// All statuses sorted by task name.
    pub fn snapshot(&self) -> Vec<TaskStatus> {
        let mut all: Vec<TaskStatus> = self.tasks.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
