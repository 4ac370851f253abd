//! Proxy node reliability tracking and rotation.

pub mod admin;
pub mod config;
pub mod controller;
pub mod engine;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;
pub mod scheduler;
pub mod stats;

pub use config::RotatorConfig;
pub use engine::{RotationEngine, TickOutcome};
pub use lifecycle::Shutdown;
pub use scheduler::TaskScheduler;
pub use stats::{ReliabilityStore, StatStore};
