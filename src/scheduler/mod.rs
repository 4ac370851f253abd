//! Task scheduling.
//!
//! # Data Flow
//! ```text
//! TaskScheduler::run
//!     → one TaskLoop per enabled task (JoinSet)
//!         → RotationEngine::tick(clock.now())
//!         → log + metrics + TaskBoard
//!         → TickEvent → coordinator (once-mode tracking)
//!         → sleep(interval) | stop
//! ```
//!
//! # Design Decisions
//! - Cadence is measured from the end of the previous tick
//! - Time comes from an injected `Clock` so tests run on paused Tokio time

pub mod board;
pub mod clock;
pub mod runner;

pub use board::{TaskBoard, TaskStatus};
pub use clock::{Clock, SystemClock};
pub use runner::{RunSummary, TaskScheduler};
