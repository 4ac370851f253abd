//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use proxy_rotator::config::TaskConfig;
use proxy_rotator::controller::{ControllerError, ControllerResult, ProxyController};
use proxy_rotator::engine::{EngineSettings, RotationEngine, TaskState};
use proxy_rotator::probe::{ProbeOutcome, ServiceProbe};
use proxy_rotator::stats::store::{StatEntry, StoreResult};
use proxy_rotator::stats::{NodeId, NodeStat, ReliabilityStore, StatStore, StoreError, Timestamp};

#[derive(Default)]
struct Group {
    nodes: Vec<NodeId>,
    current: NodeId,
}

/// In-memory proxy controller with several groups.
#[derive(Default)]
pub struct FakeController {
    groups: Mutex<HashMap<String, Group>>,
    selects: Mutex<Vec<(String, NodeId)>>,
    unreachable: Mutex<bool>,
    reject_selects: Mutex<bool>,
    stall: Mutex<Option<Duration>>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str, nodes: &[&str], current: &str) -> Self {
        self.groups.lock().unwrap().insert(
            group.to_string(),
            Group {
                nodes: nodes.iter().map(|n| n.to_string()).collect(),
                current: current.to_string(),
            },
        );
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    pub fn set_reject_selects(&self, reject: bool) {
        *self.reject_selects.lock().unwrap() = reject;
    }

    /// Make every call hang for `stall` before answering.
    pub fn set_stall(&self, stall: Duration) {
        *self.stall.lock().unwrap() = Some(stall);
    }

    /// Every successful or attempted `select_node` call, in order.
    pub fn selects(&self) -> Vec<(String, NodeId)> {
        self.selects.lock().unwrap().clone()
    }

    pub fn current(&self, group: &str) -> NodeId {
        self.groups.lock().unwrap()[group].current.clone()
    }

    async fn wait_stall(&self) {
        let stall = *self.stall.lock().unwrap();
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
    }

    fn check_reachable(&self) -> ControllerResult<()> {
        if *self.unreachable.lock().unwrap() {
            Err(ControllerError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProxyController for FakeController {
    async fn current_node(&self, group: &str) -> ControllerResult<NodeId> {
        self.wait_stall().await;
        self.check_reachable()?;
        self.groups
            .lock()
            .unwrap()
            .get(group)
            .map(|g| g.current.clone())
            .ok_or_else(|| ControllerError::GroupNotFound(group.to_string()))
    }

    async fn list_nodes(&self, group: &str) -> ControllerResult<Vec<NodeId>> {
        self.check_reachable()?;
        self.groups
            .lock()
            .unwrap()
            .get(group)
            .map(|g| g.nodes.clone())
            .ok_or_else(|| ControllerError::GroupNotFound(group.to_string()))
    }

    async fn select_node(&self, group: &str, node: &str) -> ControllerResult<()> {
        self.check_reachable()?;
        self.selects
            .lock()
            .unwrap()
            .push((group.to_string(), node.to_string()));
        if *self.reject_selects.lock().unwrap() {
            return Err(ControllerError::NotSelectable(format!("{} is not a selector", group)));
        }
        let mut groups = self.groups.lock().unwrap();
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| ControllerError::GroupNotFound(group.to_string()))?;
        entry.current = node.to_string();
        Ok(())
    }
}

/// Probe that plays back a per-service script, then repeats a fallback.
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    fallback: ProbeOutcome,
    delays: HashMap<String, Duration>,
    panics: Vec<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProbe {
    pub fn always(outcome: ProbeOutcome) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: outcome,
            delays: HashMap::new(),
            panics: Vec::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, service: &str, outcomes: Vec<ProbeOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(service.to_string(), outcomes.into());
        self
    }

    pub fn delay(mut self, service: &str, delay: Duration) -> Self {
        self.delays.insert(service.to_string(), delay);
        self
    }

    /// Panic instead of answering for `service`.
    pub fn panic_on(mut self, service: &str) -> Self {
        self.panics.push(service.to_string());
        self
    }

    pub fn calls(&self, service: &str) -> usize {
        self.calls.lock().unwrap().get(service).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ServiceProbe for ScriptedProbe {
    async fn probe(&self, service: &str, _http_proxy: &str) -> ProbeOutcome {
        *self.calls.lock().unwrap().entry(service.to_string()).or_default() += 1;
        if self.panics.iter().any(|s| s == service) {
            panic!("check for {} blew up", service);
        }
        if let Some(delay) = self.delays.get(service) {
            tokio::time::sleep(*delay).await;
        }
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(service)
            .and_then(|script| script.pop_front());
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Store whose in-memory updates land but whose writes always fail.
pub struct FailingStore {
    pub inner: StatStore,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: StatStore::new(None),
        }
    }

    fn disk_full() -> StoreError {
        StoreError::Io(std::io::Error::other("disk full"))
    }
}

impl ReliabilityStore for FailingStore {
    fn record(
        &self,
        group: &str,
        service: &str,
        node: &str,
        success: bool,
        at: Timestamp,
    ) -> StoreResult<()> {
        self.inner.record(group, service, node, success, at)?;
        Err(Self::disk_full())
    }

    fn get(&self, group: &str, service: &str, node: &str) -> Option<NodeStat> {
        self.inner.get(group, service, node)
    }

    fn list_for_service(&self, group: &str, service: &str) -> HashMap<NodeId, NodeStat> {
        self.inner.list_for_service(group, service)
    }

    fn services(&self) -> Vec<(String, String)> {
        self.inner.services()
    }

    fn snapshot(&self) -> Vec<StatEntry> {
        self.inner.snapshot()
    }

    fn clear_all(&self) -> StoreResult<()> {
        self.inner.clear_all()?;
        Err(Self::disk_full())
    }
}

pub fn blocked() -> ProbeOutcome {
    ProbeOutcome::Unreachable("HTTP 403".into())
}

pub fn task(name: &str, group: &str, service: &str) -> TaskConfig {
    TaskConfig {
        name: name.into(),
        proxy_group_name: group.into(),
        service_name: service.into(),
        enabled: true,
    }
}

pub fn settings(max_rotations: u32, confirm_samples: u32) -> Arc<EngineSettings> {
    Arc::new(EngineSettings {
        http_proxy: "http://127.0.0.1:7890".into(),
        probe_timeout: Duration::from_secs(60),
        controller_timeout: Duration::from_secs(10),
        confirm_samples,
        confirm_gap: Duration::from_secs(1),
        max_rotations,
        cooldown_secs: 30,
    })
}

pub fn engine(
    task: &TaskConfig,
    settings: Arc<EngineSettings>,
    store: Arc<dyn ReliabilityStore>,
    controller: Arc<FakeController>,
    probe: Arc<ScriptedProbe>,
) -> RotationEngine {
    RotationEngine::new(TaskState::new(task), settings, store, controller, probe)
}
