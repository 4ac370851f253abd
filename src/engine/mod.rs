//! Rotation decision engine.
//!
//! # Data Flow
//! ```text
//! TaskScheduler tick
//!     → RotationEngine::tick(now)
//!     → ProxyController::current_node
//!     → ServiceProbe (confirmed after a rotation)
//!     → ReliabilityStore::record
//!     → Healthy | rank candidates → ProxyController::select_node → Rotated
//! ```
//!
//! # States
//! ```text
//! Idle → Probing → Healthy
//!               → Unhealthy → Selecting → Rotated → (next tick) Probing
//! ```

pub mod rotation;
pub mod state;

pub use rotation::{EngineSettings, RotationEngine};
pub use state::{EnginePhase, TaskState, TickOutcome, TickReport};
