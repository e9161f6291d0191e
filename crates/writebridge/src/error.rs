//! Error types surfaced through the completion notifier.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error used at collaborator boundaries.
///
/// Upstream and sink failures are carried as-is so the completion observer
/// receives the exact value that was reported.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Terminal failure of a write pipeline.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The sink reported a write-path failure through its error callback.
    #[error("sink write failed: {0}")]
    Sink(#[source] BoxError),

    /// The upstream publisher signalled an error.
    #[error("upstream failed: {0}")]
    Upstream(#[source] BoxError),

    /// A chunk could not be converted into the sink's buffer type.
    #[error("chunk conversion failed: {0}")]
    Conversion(#[source] BoxError),

    /// The completion notifier was dropped without being resolved.
    #[error("completion abandoned before a terminal signal")]
    Abandoned,
}

impl BridgeError {
    /// Returns `true` if the failure originated at the sink boundary.
    ///
    /// Conversion failures count as sink-side: the buffer never reached the
    /// sink, but the upstream did nothing wrong.
    #[inline]
    pub fn is_sink_side(&self) -> bool {
        matches!(self, Self::Sink(_) | Self::Conversion(_))
    }

    /// Returns `true` if the upstream publisher reported the failure.
    #[inline]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Borrows the wrapped error, if any.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Sink(e) | Self::Upstream(e) | Self::Conversion(e) => Some(e.as_ref()),
            Self::Abandoned => None,
        }
    }

    /// Consumes the error and returns the wrapped value, if any.
    pub fn into_inner(self) -> Option<BoxError> {
        match self {
            Self::Sink(e) | Self::Upstream(e) | Self::Conversion(e) => Some(e),
            Self::Abandoned => None,
        }
    }
}
