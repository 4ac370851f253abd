//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Controller call / service probe:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On timeout: error surfaces as that tick's outcome
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries inside a tick; the next tick is the retry

pub mod timeouts;
