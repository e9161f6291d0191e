//! Pull-side protocol: demand-signalling subscriptions and the callbacks a
//! publisher drives.

use crate::error::BoxError;
use std::num::NonZeroU64;
use std::sync::Arc;

/// A single unit of demand.
pub const ONE: NonZeroU64 = NonZeroU64::MIN;

/// Handle through which a subscriber paces its publisher.
///
/// Implementations must tolerate calls from any thread and must treat
/// `request` after `cancel` as a no-op.
pub trait Subscription: Send + Sync {
    /// Grants the publisher permission to emit `n` more items.
    fn request(&self, n: NonZeroU64);

    /// Asks the publisher to stop emitting and release resources.
    fn cancel(&self);
}

/// Shared subscription handle as handed to [`Subscriber::on_subscribe`].
pub type SubscriptionHandle = Arc<dyn Subscription>;

/// Receiver of a publisher's signals.
///
/// A publisher calls `on_subscribe` once, then `on_next` at most as many
/// times as demand was requested, then at most one of `on_complete` or
/// `on_error`.
pub trait Subscriber<T>: Send + Sync {
    /// Attaches the subscription handle.
    fn on_subscribe(&self, subscription: SubscriptionHandle);

    /// Delivers the next item.
    fn on_next(&self, item: T);

    /// Terminal failure signal.
    fn on_error(&self, error: BoxError);

    /// Terminal success signal; no more items follow.
    fn on_complete(&self);
}
