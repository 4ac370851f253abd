//! Per-task engine state and tick results.

use serde::Serialize;

use crate::config::TaskConfig;
use crate::probe::ProbeOutcome;
use crate::stats::{NodeId, Timestamp};

/// Where a task's state machine currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Idle,
    Probing,
    Healthy,
    Unhealthy,
    Selecting,
    Rotated,
}

/// In-memory state of one monitored (group, service) pair.
///
/// Rebuilt from configuration at the start of every run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskState {
    pub name: String,
    pub proxy_group_name: String,
    pub service_name: String,
    pub enabled: bool,
    pub consecutive_rotations: u32,
    pub last_rotation_at: Option<Timestamp>,
    /// Set when the rotation limit is hit; rotations resume once it passes.
    pub cooldown_until: Option<Timestamp>,
    /// Next probe must be confirmed with repeated samples.
    pub needs_confirmation: bool,
    pub phase: EnginePhase,
}

impl TaskState {
    pub fn new(task: &TaskConfig) -> Self {
        Self {
            name: task.name.clone(),
            proxy_group_name: task.proxy_group_name.clone(),
            service_name: task.service_name.clone(),
            enabled: task.enabled,
            consecutive_rotations: 0,
            last_rotation_at: None,
            cooldown_until: None,
            needs_confirmation: true,
            phase: EnginePhase::Idle,
        }
    }
}

/// What a single tick decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Task is disabled.
    Skipped,
    /// Active node could not be resolved; nothing recorded, nothing rotated.
    ControllerError { reason: String },
    Healthy { node: NodeId },
    Rotated { from: NodeId, to: NodeId, score: f64 },
    /// Probe failed but the rotation budget is spent (cool-down).
    RotationLimitReached { node: NodeId },
    /// Probe failed and the group has no other node.
    NoAlternative { node: NodeId },
    /// The controller refused the switch.
    SelectionError { node: NodeId, reason: String },
}

impl TickOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, TickOutcome::Healthy { .. })
    }

    /// Node that is active after the tick, when known.
    pub fn node(&self) -> Option<&str> {
        match self {
            TickOutcome::Skipped | TickOutcome::ControllerError { .. } => None,
            TickOutcome::Healthy { node }
            | TickOutcome::RotationLimitReached { node }
            | TickOutcome::NoAlternative { node }
            | TickOutcome::SelectionError { node, .. } => Some(node),
            TickOutcome::Rotated { to, .. } => Some(to),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Skipped => "skipped",
            TickOutcome::ControllerError { .. } => "controller_error",
            TickOutcome::Healthy { .. } => "healthy",
            TickOutcome::Rotated { .. } => "rotated",
            TickOutcome::RotationLimitReached { .. } => "rotation_limit_reached",
            TickOutcome::NoAlternative { .. } => "no_alternative",
            TickOutcome::SelectionError { .. } => "selection_error",
        }
    }
}

/// Outcome plus the side results a collaborator needs to log.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// Probe result, absent when no probe ran.
    pub probe: Option<ProbeOutcome>,
    /// Set when the observation could not be persisted.
    pub persist_error: Option<String>,
}

impl TickReport {
    pub fn new(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            probe: None,
            persist_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_task() {
        let state = TaskState::new(&TaskConfig {
            name: "gpt".into(),
            proxy_group_name: "AI".into(),
            service_name: "chatgpt".into(),
            enabled: true,
        });
        assert_eq!(state.phase, EnginePhase::Idle);
        assert!(state.needs_confirmation);
        assert_eq!(state.consecutive_rotations, 0);
    }

    #[test]
    fn test_outcome_node() {
        let rotated = TickOutcome::Rotated {
            from: "A".into(),
            to: "B".into(),
            score: 0.5,
        };
        assert_eq!(rotated.node(), Some("B"));
        assert_eq!(rotated.label(), "rotated");
        assert_eq!(
            TickOutcome::ControllerError { reason: "down".into() }.node(),
            None
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(TickOutcome::NoAlternative { node: "A".into() }).unwrap();
        assert_eq!(json["kind"], "no_alternative");
        assert_eq!(json["node"], "A");
    }
}
