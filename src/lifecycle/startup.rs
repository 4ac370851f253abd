//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the statistics store
//! - Build the controller client, probe, engines and scheduler
//! - Start optional metrics exporter and admin API
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Configuration is already validated when this runs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::config::{paths, RotatorConfig};
use crate::controller::{ClashController, ControllerError, ProxyController};
use crate::engine::{EngineSettings, RotationEngine, TaskState};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::probe::{HttpProbe, ServiceProbe};
use crate::scheduler::{SystemClock, TaskBoard, TaskScheduler};
use crate::stats::{ReliabilityStore, StatStore, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open statistics store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to create controller client: {0}")]
    Controller(#[from] ControllerError),

    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),

    #[error("failed to bind admin API on {address}: {source}")]
    AdminBind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a run needs, wired together.
pub struct Runtime {
    pub store: Arc<StatStore>,
    pub board: TaskBoard,
    pub scheduler: TaskScheduler,
    pub admin: Option<JoinHandle<()>>,
}

/// Statistics file location from config or the platform default.
pub fn stats_path(config: &RotatorConfig) -> PathBuf {
    config
        .storage
        .path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(paths::default_stats_path)
}

/// Open the durable statistics store.
pub fn open_store(config: &RotatorConfig) -> Result<StatStore, StartupError> {
    let path = stats_path(config);
    let store = StatStore::open(&path)?;
    tracing::info!(path = %path.display(), entries = store.len(), "Statistics loaded");
    Ok(store)
}

/// Build one engine per enabled task.
pub fn build_engines(
    config: &RotatorConfig,
    store: Arc<dyn ReliabilityStore>,
    controller: Arc<dyn ProxyController>,
    probe: Arc<dyn ServiceProbe>,
) -> Vec<RotationEngine> {
    let settings = Arc::new(EngineSettings::from_config(config));
    config
        .enabled_tasks()
        .map(|task| {
            RotationEngine::new(
                TaskState::new(task),
                settings.clone(),
                store.clone(),
                controller.clone(),
                probe.clone(),
            )
        })
        .collect()
}

fn parse_addr(address: &str) -> Result<SocketAddr, StartupError> {
    address.parse().map_err(|e: std::net::AddrParseError| StartupError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Initialize all subsystems in dependency order.
pub async fn start(config: &RotatorConfig, shutdown: &Shutdown) -> Result<Runtime, StartupError> {
    // 1. Metrics exporter
    if config.observability.metrics_enabled {
        let addr = parse_addr(&config.observability.metrics_address)?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    // 2. Store
    let store = Arc::new(open_store(config)?);

    // 3. Collaborators
    let controller = Arc::new(ClashController::new(&config.controller)?);
    tracing::debug!(controller = ?controller, "Controller client ready");
    let probe = Arc::new(HttpProbe::new(Duration::from_secs(config.probe.timeout_secs)));

    // 4. Engines and scheduler
    let board = TaskBoard::new();
    let engines = build_engines(config, store.clone(), controller, probe);
    let scheduler = TaskScheduler::new(
        engines,
        &config.monitoring,
        Arc::new(SystemClock::new()),
        board.clone(),
    );

    // 5. Admin API last
    let admin = if config.admin.enabled {
        let address = config.admin.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::AdminBind { address, source })?;
        let state = AdminState {
            store: store.clone(),
            board: board.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, shutdown).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        }))
    } else {
        None
    };

    Ok(Runtime {
        store,
        board,
        scheduler,
        admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;

    #[test]
    fn test_stats_path_override() {
        let mut config = RotatorConfig::default();
        config.storage.path = Some("/tmp/stats.json".into());
        assert_eq!(stats_path(&config), PathBuf::from("/tmp/stats.json"));

        config.storage.path = Some("  ".into());
        assert_eq!(stats_path(&config), paths::default_stats_path());
    }

    #[tokio::test]
    async fn test_builds_only_enabled_tasks() {
        let mut config = RotatorConfig::default();
        config.tasks = vec![
            TaskConfig {
                name: "a".into(),
                proxy_group_name: "G".into(),
                service_name: "netflix".into(),
                enabled: true,
            },
            TaskConfig {
                name: "b".into(),
                proxy_group_name: "G".into(),
                service_name: "gemini".into(),
                enabled: false,
            },
        ];
        let controller = Arc::new(ClashController::new(&config.controller).unwrap());
        let engines = build_engines(
            &config,
            Arc::new(StatStore::new(None)),
            controller,
            Arc::new(HttpProbe::new(Duration::from_secs(1))),
        );
        assert_eq!(engines.len(), 1);
        assert_eq!(engines[0].name(), "a");
    }
}
