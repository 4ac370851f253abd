//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Store → Controller + Probe → Engines → Scheduler → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop task loops → Grace period for in-flight ticks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Second signal → Forced exit (130)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: store first, admin API last
//! - Shutdown has a deadline: stragglers are aborted after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
