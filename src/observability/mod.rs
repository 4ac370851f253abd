//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler, engine, store, admin API produce:
//!     → logging.rs (structured log events, run-id span)
//!     → metrics.rs (tick, probe, rotation counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Every tick outcome is logged at a level matching its severity
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
