//! Error types for write queue operations.

use thiserror::Error;

/// Write-path failures reported by [`WriteQueue`](crate::WriteQueue) through
/// its error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A buffer was written after `end()`.
    #[error("write after end")]
    WriteAfterEnd,

    /// The reading side was dropped before the queue ended.
    #[error("write queue reader closed")]
    Closed,
}
