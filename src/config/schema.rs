//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the rotator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the rotator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RotatorConfig {
    /// Proxy controller connection settings.
    pub controller: ControllerConfig,

    /// Service probe settings.
    pub probe: ProbeConfig,

    /// Scheduling and rotation behavior.
    pub monitoring: MonitoringConfig,

    /// Statistics persistence.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Monitored (proxy group, service) pairs.
    pub tasks: Vec<TaskConfig>,
}

impl RotatorConfig {
    /// Tasks that should actually be scheduled.
    pub fn enabled_tasks(&self) -> impl Iterator<Item = &TaskConfig> {
        self.tasks.iter().filter(|t| t.enabled)
    }
}

/// Proxy controller (external-controller REST API) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Controller address, with or without scheme (e.g., "127.0.0.1:9097").
    pub address: String,

    /// Bearer secret, if the controller requires one.
    pub secret: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Drop group members the controller reports as not alive.
    pub skip_dead_nodes: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9097".to_string(),
            secret: None,
            timeout_secs: 10,
            skip_dead_nodes: true,
        }
    }
}

/// Service probe settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// HTTP proxy the probe is routed through.
    pub http_proxy: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Probes required to trust a freshly selected node.
    pub confirm_samples: u32,

    /// Delay between confirmation probes in milliseconds.
    pub confirm_gap_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_proxy: "http://127.0.0.1:7890".to_string(),
            timeout_secs: 30,
            confirm_samples: 3,
            confirm_gap_ms: 1000,
        }
    }
}

/// Monitoring behavior. Immutable for the lifetime of a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Seconds between the end of one tick and the start of the next.
    pub interval_sec: f64,

    /// Rotations allowed before cooling down (0 = unlimited).
    pub max_rotations: u32,

    /// Stop once every task has been healthy at least once.
    pub once: bool,

    /// Cool-down after the rotation limit is hit, in seconds.
    pub cooldown_secs: u64,

    /// Time in-flight ticks get to finish on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_sec: 30.0,
            max_rotations: 0,
            once: false,
            cooldown_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Statistics persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Statistics file. Defaults to `node_stats.json` in the data directory.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Bind address for the admin API.
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8082".to_string(),
            api_key: String::new(),
        }
    }
}

/// One monitored (proxy group, service) pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Task identifier for logging.
    pub name: String,

    /// Proxy group whose active node is rotated.
    pub proxy_group_name: String,

    /// Service to probe (see `probe::ServiceKind` for aliases).
    pub service_name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RotatorConfig = toml::from_str(
            r#"
            [[tasks]]
            name = "ai"
            proxy_group_name = "Proxy"
            service_name = "openai"
            "#,
        )
        .unwrap();

        assert_eq!(config.controller.address, "127.0.0.1:9097");
        assert_eq!(config.monitoring.interval_sec, 30.0);
        assert_eq!(config.monitoring.max_rotations, 0);
        assert!(!config.monitoring.once);
        assert_eq!(config.tasks.len(), 1);
        assert!(config.tasks[0].enabled);
    }

    #[test]
    fn test_enabled_tasks_filter() {
        let config: RotatorConfig = toml::from_str(
            r#"
            [[tasks]]
            name = "a"
            proxy_group_name = "G"
            service_name = "netflix"

            [[tasks]]
            name = "b"
            proxy_group_name = "G"
            service_name = "gemini"
            enabled = false
            "#,
        )
        .unwrap();

        let names: Vec<_> = config.enabled_tasks().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }
}
