//! Node reliability statistics.
//!
//! # Data Flow
//! ```text
//! RotationEngine probe result
//!     → store.rs (fold into NodeStat, persist)
//!
//! Candidate selection:
//!     store.rs (stats for group+service)
//!     → scorer.rs (score, rank)
//!     → best candidate
//!
//! Reporting (CLI, admin API):
//!     store.rs → report.rs (summary, ranking)
//! ```
//!
//! # Design Decisions
//! - Scores are derived on demand, never stored
//! - The store is shared by all tasks; per-key locking keeps counters consistent
//! - Stats are only ever removed by the explicit clear-all command

pub mod record;
pub mod report;
pub mod scorer;
pub mod store;

pub use record::{NodeId, NodeStat, StatKey, Timestamp};
pub use store::{ReliabilityStore, StatStore, StoreError};
