//! The per-task rotation state machine.
//!
//! # Responsibilities
//! - Resolve the active node, probe the service through it, record the result
//! - On failure pick the best-scored alternative and switch to it
//! - Enforce the rotation budget and its cool-down
//!
//! # Design Decisions
//! - Each state transition is its own step function
//! - Every controller and probe call runs under a deadline
//! - A failed store write is reported, never allowed to block the decision

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RotatorConfig;
use crate::controller::{ControllerError, ControllerResult, ProxyController};
use crate::engine::state::{EnginePhase, TaskState, TickOutcome, TickReport};
use crate::probe::{probe_confirmed, ProbeOutcome, ServiceProbe};
use crate::resilience::timeouts::with_deadline;
use crate::stats::scorer::rank_candidates;
use crate::stats::{NodeId, ReliabilityStore, Timestamp};

/// Read-only knobs shared by every engine of a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub http_proxy: String,
    pub probe_timeout: Duration,
    pub controller_timeout: Duration,
    pub confirm_samples: u32,
    pub confirm_gap: Duration,
    /// 0 means unlimited.
    pub max_rotations: u32,
    pub cooldown_secs: u64,
}

impl EngineSettings {
    pub fn from_config(config: &RotatorConfig) -> Self {
        Self {
            http_proxy: config.probe.http_proxy.clone(),
            probe_timeout: Duration::from_secs(config.probe.timeout_secs),
            controller_timeout: Duration::from_secs(config.controller.timeout_secs),
            confirm_samples: config.probe.confirm_samples.max(1),
            confirm_gap: Duration::from_millis(config.probe.confirm_gap_ms),
            max_rotations: config.monitoring.max_rotations,
            cooldown_secs: config.monitoring.cooldown_secs,
        }
    }

    /// Upper bound for one (possibly confirmed) probe.
    fn probe_budget(&self, samples: u32) -> Duration {
        self.probe_timeout
            .saturating_mul(samples)
            .saturating_add(self.confirm_gap.saturating_mul(samples.saturating_sub(1)))
    }
}

/// Drives one task. Owns its `TaskState`; shares the store and collaborators.
pub struct RotationEngine {
    state: TaskState,
    settings: Arc<EngineSettings>,
    store: Arc<dyn ReliabilityStore>,
    controller: Arc<dyn ProxyController>,
    probe: Arc<dyn ServiceProbe>,
}

impl RotationEngine {
    pub fn new(
        state: TaskState,
        settings: Arc<EngineSettings>,
        store: Arc<dyn ReliabilityStore>,
        controller: Arc<dyn ProxyController>,
        probe: Arc<dyn ServiceProbe>,
    ) -> Self {
        Self {
            state,
            settings,
            store,
            controller,
            probe,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Run one probe/decide/rotate cycle.
    pub async fn tick(&mut self, now: Timestamp) -> TickReport {
        if !self.state.enabled {
            self.state.phase = EnginePhase::Idle;
            return TickReport::new(TickOutcome::Skipped);
        }

        self.state.phase = EnginePhase::Probing;
        let current = match self.resolve_current().await {
            Ok(node) => node,
            Err(e) => {
                self.state.phase = EnginePhase::Idle;
                return TickReport::new(TickOutcome::ControllerError {
                    reason: e.to_string(),
                });
            }
        };

        let probe = self.probe_current().await;
        let persist_error = self
            .store
            .record(
                &self.state.proxy_group_name,
                &self.state.service_name,
                &current,
                probe.is_reachable(),
                now,
            )
            .err()
            .map(|e| e.to_string());

        let outcome = if probe.is_reachable() {
            self.on_healthy(current)
        } else {
            self.state.phase = EnginePhase::Unhealthy;
            self.on_unhealthy(current, now).await
        };

        TickReport {
            outcome,
            probe: Some(probe),
            persist_error,
        }
    }

    async fn resolve_current(&self) -> ControllerResult<NodeId> {
        let group = &self.state.proxy_group_name;
        self.bounded("current_node", self.controller.current_node(group))
            .await
    }

    async fn probe_current(&mut self) -> ProbeOutcome {
        let samples = if self.state.needs_confirmation {
            self.settings.confirm_samples
        } else {
            1
        };
        let budget = self.settings.probe_budget(samples);
        let outcome = with_deadline(
            "probe",
            budget,
            probe_confirmed(
                self.probe.as_ref(),
                &self.state.service_name,
                &self.settings.http_proxy,
                samples,
                self.settings.confirm_gap,
            ),
        )
        .await
        .unwrap_or_else(|e| ProbeOutcome::Error(e.to_string()));

        self.state.needs_confirmation = false;
        outcome
    }

    fn on_healthy(&mut self, node: NodeId) -> TickOutcome {
        self.state.consecutive_rotations = 0;
        self.state.cooldown_until = None;
        self.state.phase = EnginePhase::Healthy;
        TickOutcome::Healthy { node }
    }

    async fn on_unhealthy(&mut self, current: NodeId, now: Timestamp) -> TickOutcome {
        if !self.rotation_allowed(now) {
            tracing::debug!(
                task = %self.state.name,
                until = ?self.state.cooldown_until,
                "Rotation budget spent"
            );
            return TickOutcome::RotationLimitReached { node: current };
        }

        let group = self.state.proxy_group_name.clone();
        let nodes = match self.bounded("list_nodes", self.controller.list_nodes(&group)).await {
            Ok(nodes) => nodes,
            Err(e) => {
                return TickOutcome::ControllerError {
                    reason: e.to_string(),
                }
            }
        };

        let Some((chosen, score)) = self.best_candidate(&current, nodes) else {
            return TickOutcome::NoAlternative { node: current };
        };

        self.state.phase = EnginePhase::Selecting;
        if let Err(e) = self
            .bounded("select_node", self.controller.select_node(&group, &chosen))
            .await
        {
            self.state.phase = EnginePhase::Unhealthy;
            return TickOutcome::SelectionError {
                node: current,
                reason: e.to_string(),
            };
        }

        self.state.consecutive_rotations += 1;
        self.state.last_rotation_at = Some(now);
        self.state.needs_confirmation = true;
        self.state.phase = EnginePhase::Rotated;
        TickOutcome::Rotated {
            from: current,
            to: chosen,
            score,
        }
    }

    /// Checks the rotation budget, starting or ending the cool-down as needed.
    fn rotation_allowed(&mut self, now: Timestamp) -> bool {
        let max = self.settings.max_rotations;
        if max == 0 || self.state.consecutive_rotations < max {
            return true;
        }
        match self.state.cooldown_until {
            None => {
                self.state.cooldown_until = Some(now.saturating_add(self.settings.cooldown_secs));
                false
            }
            Some(until) if now < until => false,
            Some(_) => {
                self.state.consecutive_rotations = 0;
                self.state.cooldown_until = None;
                true
            }
        }
    }

    fn best_candidate(&self, current: &str, nodes: Vec<NodeId>) -> Option<(NodeId, f64)> {
        let candidates: Vec<NodeId> = nodes.into_iter().filter(|n| n != current).collect();
        if candidates.is_empty() {
            return None;
        }
        let stats = self
            .store
            .list_for_service(&self.state.proxy_group_name, &self.state.service_name);
        rank_candidates(&candidates, &stats).into_iter().next()
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> ControllerResult<T>
    where
        F: Future<Output = ControllerResult<T>>,
    {
        let limit = self.settings.controller_timeout;
        with_deadline(operation, limit, fut)
            .await
            .unwrap_or_else(|_| Err(ControllerError::Timeout(limit.as_secs())))
    }
}
