//! Demand accounting shared between a subscription handle and its pump task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use writebridge::Subscription;

/// Outstanding demand plus a cancellation flag.
#[derive(Debug)]
pub(crate) struct Credit {
    /// Units requested but not yet consumed.
    demand: AtomicU64,
    /// Total units ever granted (saturating).
    granted: AtomicU64,
    cancelled: AtomicBool,
    /// Wakes the pump when demand arrives or the subscription is cancelled.
    notify: Notify,
}

impl Credit {
    pub(crate) fn new() -> Self {
        Self {
            demand: AtomicU64::new(0),
            granted: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Adds `n` units of demand. No-op after cancellation.
    pub(crate) fn grant(&self, n: u64) {
        if self.is_cancelled() {
            return;
        }
        saturating_add(&self.demand, n);
        saturating_add(&self.granted, n);
        self.notify.notify_one();
    }

    /// Marks the subscription cancelled and wakes the pump.
    ///
    /// Idempotent - only the first call has effect.
    pub(crate) fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn granted(&self) -> u64 {
        self.granted.load(Ordering::Acquire)
    }

    /// Waits for one unit of demand and consumes it.
    ///
    /// Returns `false` if the subscription was cancelled first.
    pub(crate) async fn acquire(&self) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            if self
                .demand
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1))
                .is_ok()
            {
                return true;
            }
            // notify_one stores a permit when nobody is waiting, so a grant
            // landing between the check above and this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Resolves once the subscription is cancelled.
    pub(crate) async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.notify.notified().await;
        }
    }
}

/// Adds `n` to `counter`, pinning at `u64::MAX`.
fn saturating_add(counter: &AtomicU64, n: u64) {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        let next = current.saturating_add(n);
        if next == current {
            return;
        }
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// [`Subscription`] handed to subscribers of a
/// [`StreamPublisher`](crate::StreamPublisher).
pub(crate) struct StreamSubscription {
    credit: Arc<Credit>,
}

impl StreamSubscription {
    pub(crate) fn new(credit: Arc<Credit>) -> Self {
        Self { credit }
    }
}

impl Subscription for StreamSubscription {
    fn request(&self, n: std::num::NonZeroU64) {
        self.credit.grant(n.get());
    }

    fn cancel(&self) {
        self.credit.cancel();
    }
}
