//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, default <data_dir>/config.toml)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RotatorConfig (validated, immutable)
//!     → EngineSettings shared via Arc with every RotationEngine
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a run never reloads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod paths;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::ControllerConfig;
pub use schema::MonitoringConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::RotatorConfig;
pub use schema::TaskConfig;
