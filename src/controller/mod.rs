//! Proxy controller access.
//!
//! # Data Flow
//! ```text
//! RotationEngine
//!     → ProxyController::current_node (which node is active?)
//!     → ProxyController::list_nodes   (who can replace it?)
//!     → ProxyController::select_node  (switch)
//!
//! clash.rs: REST implementation against a Clash-compatible external controller
//! ```
//!
//! # Design Decisions
//! - The engine only sees the trait, so tests use in-memory fakes
//! - Every call is bounded by a timeout at the call site

pub mod clash;

use async_trait::async_trait;
use thiserror::Error;

use crate::stats::NodeId;

pub use clash::ClashController;

/// Errors raised by the proxy controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Controller unreachable or connection failed.
    #[error("controller transport error: {0}")]
    Transport(String),

    /// Controller did not answer in time.
    #[error("controller timeout after {0} seconds")]
    Timeout(u64),

    /// Proxy group does not exist.
    #[error("proxy group '{0}' not found")]
    GroupNotFound(String),

    /// Group rejects manual selection, or rejected the chosen node.
    #[error("selection rejected: {0}")]
    NotSelectable(String),

    /// Unexpected HTTP status.
    #[error("controller returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("invalid controller response: {0}")]
    Decode(String),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Lists and selects nodes inside named proxy groups.
#[async_trait]
pub trait ProxyController: Send + Sync {
    /// Node currently selected in `group`.
    async fn current_node(&self, group: &str) -> ControllerResult<NodeId>;

    /// Selectable members of `group`, in controller order.
    async fn list_nodes(&self, group: &str) -> ControllerResult<Vec<NodeId>>;

    /// Make `node` the active member of `group`.
    async fn select_node(&self, group: &str, node: &str) -> ControllerResult<()>;
}
