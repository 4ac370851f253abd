//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, timeouts > 0)
//! - Check task definitions (unique names, known services)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RotatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::RotatorConfig;
use crate::controller::clash::controller_base_url;
use crate::probe::ServiceKind;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Longest accepted tick interval, in seconds.
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;
const MAX_TIMEOUT_SECS: u64 = 3_600;
const MAX_CONFIRM_SAMPLES: u32 = 20;
const MAX_CONFIRM_GAP_MS: u64 = 600_000;
const MAX_COOLDOWN_SECS: u64 = 7 * 86_400;
const MAX_GRACE_SECS: u64 = 3_600;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("monitoring.interval_sec must be in (0, 86400] (got {0})")]
    InvalidInterval(f64),

    #[error("no tasks configured")]
    NoTasks,

    #[error("task #{0} has an empty name")]
    EmptyTaskName(usize),

    #[error("duplicate task name '{0}'")]
    DuplicateTask(String),

    #[error("task '{0}' has an empty proxy_group_name")]
    EmptyGroup(String),

    #[error("task '{task}' uses unknown service '{service}'")]
    UnknownService { task: String, service: String },

    #[error("controller.address '{0}' is not a valid URL")]
    InvalidControllerAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field} must be at most {max} (got {value})")]
    TooLarge {
        field: &'static str,
        max: u64,
        value: u64,
    },

    #[error("observability.log_level '{0}' is not one of trace/debug/info/warn/error")]
    InvalidLogLevel(String),

    #[error("observability.log_format '{0}' is not one of pretty/json")]
    InvalidLogFormat(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RotatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let interval = config.monitoring.interval_sec;
    if !interval.is_finite() || interval <= 0.0 || interval > MAX_INTERVAL_SECS {
        errors.push(ValidationError::InvalidInterval(interval));
    }

    if config.tasks.is_empty() {
        errors.push(ValidationError::NoTasks);
    }

    let mut seen = HashSet::new();
    for (i, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            errors.push(ValidationError::EmptyTaskName(i));
        } else if !seen.insert(task.name.as_str()) {
            errors.push(ValidationError::DuplicateTask(task.name.clone()));
        }
        if task.proxy_group_name.trim().is_empty() {
            errors.push(ValidationError::EmptyGroup(task.name.clone()));
        }
        if ServiceKind::from_name(&task.service_name).is_none() {
            errors.push(ValidationError::UnknownService {
                task: task.name.clone(),
                service: task.service_name.clone(),
            });
        }
    }

    if controller_base_url(&config.controller.address).is_err() {
        errors.push(ValidationError::InvalidControllerAddress(
            config.controller.address.clone(),
        ));
    }
    if config.controller.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("controller.timeout_secs"));
    }
    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("probe.timeout_secs"));
    }
    if config.probe.confirm_samples == 0 {
        errors.push(ValidationError::ZeroValue("probe.confirm_samples"));
    }

    let limits = [
        ("controller.timeout_secs", config.controller.timeout_secs, MAX_TIMEOUT_SECS),
        ("probe.timeout_secs", config.probe.timeout_secs, MAX_TIMEOUT_SECS),
        (
            "probe.confirm_samples",
            u64::from(config.probe.confirm_samples),
            u64::from(MAX_CONFIRM_SAMPLES),
        ),
        ("probe.confirm_gap_ms", config.probe.confirm_gap_ms, MAX_CONFIRM_GAP_MS),
        ("monitoring.cooldown_secs", config.monitoring.cooldown_secs, MAX_COOLDOWN_SECS),
        (
            "monitoring.shutdown_grace_secs",
            config.monitoring.shutdown_grace_secs,
            MAX_GRACE_SECS,
        ),
    ];
    for (field, value, max) in limits {
        if value > max {
            errors.push(ValidationError::TooLarge { field, max, value });
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    let format = config.observability.log_format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::InvalidLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
