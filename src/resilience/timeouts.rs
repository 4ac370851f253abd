//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap controller and probe calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} timed out after {elapsed:?}")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub elapsed: Duration,
}

/// Run `fut` with a deadline.
pub async fn with_deadline<F, T>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded {
            operation,
            elapsed: limit,
        })
}
