//! Concurrent task scheduling.
//!
//! # Responsibilities
//! - Run one independent loop per enabled task
//! - Sleep `interval` after each tick returns, so slow tasks only delay themselves
//! - Stop when every task was healthy once (`once` mode) or on shutdown
//! - Log, count and publish every tick outcome
//!
//! # Design Decisions
//! - Task loops never share state beyond the store and the board
//! - In-flight ticks get a bounded grace period before being aborted

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::validation::MAX_INTERVAL_SECS;
use crate::config::MonitoringConfig;
use crate::engine::{RotationEngine, TaskState, TickOutcome, TickReport};
use crate::observability::metrics;
use crate::probe::ProbeOutcome;
use crate::scheduler::board::TaskBoard;
use crate::scheduler::clock::Clock;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub tasks: usize,
    pub ticks: u64,
    /// Every task reported healthy at least once.
    pub all_healthy: bool,
    /// Stopped by an external shutdown signal.
    pub interrupted: bool,
    /// Tasks whose loop panicked and stopped ticking.
    pub failed_tasks: Vec<String>,
}

struct TickEvent {
    task: String,
    healthy: bool,
}

/// Runs every enabled `RotationEngine` on its own timer.
pub struct TaskScheduler {
    engines: Vec<RotationEngine>,
    interval: Duration,
    once: bool,
    grace: Duration,
    clock: Arc<dyn Clock>,
    board: TaskBoard,
}

impl TaskScheduler {
    pub fn new(
        engines: Vec<RotationEngine>,
        monitoring: &MonitoringConfig,
        clock: Arc<dyn Clock>,
        board: TaskBoard,
    ) -> Self {
        let engines: Vec<RotationEngine> = engines
            .into_iter()
            .filter(|e| e.state().enabled)
            .collect();
        for engine in &engines {
            board.register(engine.state());
        }
        Self {
            engines,
            interval: interval_from_secs(monitoring.interval_sec),
            once: monitoring.once,
            grace: Duration::from_secs(monitoring.shutdown_grace_secs),
            clock,
            board,
        }
    }

    pub fn board(&self) -> TaskBoard {
        self.board.clone()
    }

    pub fn task_count(&self) -> usize {
        self.engines.len()
    }

    /// Run until done. `shutdown` ends the run from outside.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_inner(run_id, shutdown).instrument(span).await
    }

    async fn run_inner(self, run_id: Uuid, mut shutdown: broadcast::Receiver<()>) -> RunSummary {
        let mut summary = RunSummary {
            run_id,
            tasks: self.engines.len(),
            ticks: 0,
            all_healthy: false,
            interrupted: false,
            failed_tasks: Vec::new(),
        };
        if self.engines.is_empty() {
            tracing::warn!("No enabled tasks, nothing to schedule");
            return summary;
        }

        tracing::info!(
            tasks = summary.tasks,
            interval = ?self.interval,
            once = self.once,
            "Scheduler starting"
        );

        let (stop_tx, _) = broadcast::channel::<()>(1);
        let (event_tx, mut event_rx) = mpsc::channel::<TickEvent>(64);
        let mut pending: HashSet<String> = self
            .engines
            .iter()
            .map(|e| e.name().to_string())
            .collect();

        let mut loops = JoinSet::new();
        let mut names: HashMap<tokio::task::Id, String> = HashMap::new();
        for engine in self.engines {
            let name = engine.name().to_string();
            let task_loop = TaskLoop {
                engine,
                interval: self.interval,
                clock: self.clock.clone(),
                board: self.board.clone(),
                events: event_tx.clone(),
                stop: stop_tx.subscribe(),
            };
            let handle = loops.spawn(task_loop.run().in_current_span());
            names.insert(handle.id(), name);
        }
        drop(event_tx);

        let mut shutdown_closed = false;
        let mut settled = false;
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    summary.ticks += 1;
                    if event.healthy {
                        pending.remove(&event.task);
                    }
                }
                Some(joined) = loops.join_next_with_id() => match joined {
                    Ok((id, ())) => {
                        names.remove(&id);
                    }
                    Err(e) => {
                        let task = names.remove(&e.id()).unwrap_or_default();
                        tracing::error!(task = %task, error = %e, "Task loop crashed");
                        pending.remove(&task);
                        summary.failed_tasks.push(task);
                    }
                },
                signal = shutdown.recv(), if !shutdown_closed => match signal {
                    Err(broadcast::error::RecvError::Closed) => shutdown_closed = true,
                    _ => {
                        tracing::info!("Shutdown requested, stopping task loops");
                        summary.interrupted = true;
                        break;
                    }
                },
            }

            if pending.is_empty() && !settled {
                settled = true;
                summary.all_healthy = summary.failed_tasks.is_empty();
                if summary.all_healthy {
                    tracing::info!("Every task has reported healthy");
                } else {
                    tracing::warn!(
                        failed = ?summary.failed_tasks,
                        "Every remaining task has reported healthy"
                    );
                }
                if self.once {
                    break;
                }
            }
        }

        let _ = stop_tx.send(());
        drop(event_rx);
        drain(&mut loops, self.grace).await;

        tracing::info!(
            ticks = summary.ticks,
            all_healthy = summary.all_healthy,
            interrupted = summary.interrupted,
            failed = summary.failed_tasks.len(),
            "Scheduler stopped"
        );
        summary
    }
}

/// Clamp the configured interval to what `Duration` and the validator accept.
fn interval_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.001, MAX_INTERVAL_SECS))
        .unwrap_or(Duration::from_secs(MAX_INTERVAL_SECS as u64))
}

/// Wait for task loops to finish their current tick, aborting stragglers.
async fn drain(loops: &mut JoinSet<()>, grace: Duration) {
    let finished = tokio::time::timeout(grace, async {
        while loops.join_next().await.is_some() {}
    })
    .await;
    if finished.is_err() {
        tracing::warn!(
            remaining = loops.len(),
            grace = ?grace,
            "Tasks still busy after grace period, aborting"
        );
        loops.abort_all();
        while loops.join_next().await.is_some() {}
    }
}

struct TaskLoop {
    engine: RotationEngine,
    interval: Duration,
    clock: Arc<dyn Clock>,
    board: TaskBoard,
    events: mpsc::Sender<TickEvent>,
    stop: broadcast::Receiver<()>,
}

impl TaskLoop {
    async fn run(mut self) {
        let span = tracing::info_span!("task", task = %self.engine.name());
        async move {
            loop {
                let now = self.clock.now();
                let report = self.engine.tick(now).await;
                publish(self.engine.state(), &report);
                self.board.update(self.engine.state(), &report, now);

                let event = TickEvent {
                    task: self.engine.name().to_string(),
                    healthy: report.outcome.is_healthy(),
                };
                if self.events.send(event).await.is_err() {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = self.stop.recv() => break,
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Log and count one tick.
fn publish(state: &TaskState, report: &TickReport) {
    let group = state.proxy_group_name.as_str();
    let service = state.service_name.as_str();
    metrics::record_tick(&state.name, report.outcome.label());

    if let Some(probe) = &report.probe {
        metrics::record_probe(service, probe.label());
        if let ProbeOutcome::Error(detail) = probe {
            tracing::warn!(group, service, error = %detail, "Probe could not complete");
        }
    }

    match &report.outcome {
        TickOutcome::Skipped => tracing::debug!("Task disabled, skipped"),
        TickOutcome::Healthy { node } => {
            tracing::info!(group, service, node = %node, "Service reachable");
        }
        TickOutcome::Rotated { from, to, score } => {
            metrics::record_rotation(group);
            metrics::record_node_score(group, service, to, *score);
            tracing::warn!(
                group,
                service,
                from = %from,
                to = %to,
                score,
                rotations = state.consecutive_rotations,
                "Service unreachable, switched node"
            );
        }
        TickOutcome::RotationLimitReached { node } => {
            tracing::warn!(
                group,
                service,
                node = %node,
                until = ?state.cooldown_until,
                "Service unreachable, rotation limit reached"
            );
        }
        TickOutcome::NoAlternative { node } => {
            tracing::warn!(group, service, node = %node, "Service unreachable, no other node in group");
        }
        TickOutcome::ControllerError { reason } => {
            tracing::error!(group, error = %reason, "Controller request failed");
        }
        TickOutcome::SelectionError { node, reason } => {
            tracing::error!(group, node = %node, error = %reason, "Node switch rejected");
        }
    }

    if let Some(e) = &report.persist_error {
        metrics::record_store_error();
        tracing::error!(group, service, error = %e, "Failed to persist statistics");
    }
}
