//! One-shot completion observer.

use crate::error::BridgeError;

/// Receives the single terminal outcome of a write pipeline.
///
/// The adapter guarantees that exactly one of `succeed` or `fail` is called,
/// and at most once, over the notifier's lifetime.
pub trait CompletionNotifier: Send + Sync {
    /// The pipeline finished: upstream completed or the owner cancelled.
    fn succeed(&self);

    /// The pipeline failed.
    fn fail(&self, error: BridgeError);
}

impl<N: CompletionNotifier + ?Sized> CompletionNotifier for std::sync::Arc<N> {
    #[inline]
    fn succeed(&self) {
        (**self).succeed();
    }

    #[inline]
    fn fail(&self, error: BridgeError) {
        (**self).fail(error);
    }
}
