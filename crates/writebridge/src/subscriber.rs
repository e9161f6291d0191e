//! The flow-control adapter: a [`Subscriber`] that forwards chunks into a
//! [`WriteSink`] and paces upstream demand by the sink's fullness.

use crate::convert::{ChunkConverter, Passthrough};
use crate::demand::{DemandGate, DemandState};
use crate::error::{BoxError, BridgeError};
#[cfg(debug_assertions)]
use crate::invariants::{debug_assert_demand_outstanding, debug_assert_resolved_once};
use crate::metrics::BridgeMetrics;
use crate::notifier::CompletionNotifier;
use crate::sink::WriteSink;
use crate::subscription::{Subscriber, SubscriptionHandle, ONE};
use crate::terminal::TerminalGuard;
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, trace, warn};

const DEFAULT_NAME: &str = "write-stream";

/// State shared between the adapter and the callbacks it registers on the
/// sink. Holds no reference to the sink itself.
struct Shared<N> {
    name: Arc<str>,
    notifier: N,
    terminal: TerminalGuard,
    demand: DemandGate,
    subscription: Mutex<Option<SubscriptionHandle>>,
    metrics: Arc<BridgeMetrics>,
    #[cfg(debug_assertions)]
    resolutions: AtomicUsize,
}

impl<N: CompletionNotifier> Shared<N> {
    fn current_subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn release_subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Requests one unit if a subscription is held and none is outstanding.
    ///
    /// The lock is released before `request` runs: publishers may deliver
    /// `on_next` synchronously from inside it.
    fn request_one(&self, from_drain: bool) {
        let Some(subscription) = self.current_subscription() else {
            trace!(pipeline = %self.name, from_drain, "no subscription; demand deferred");
            return;
        };
        if self.demand.try_claim() {
            self.metrics.record_request(from_drain);
            trace!(pipeline = %self.name, from_drain, "requesting 1");
            subscription.request(ONE);
        }
    }

    /// Claims the terminal transition. Returns `false` for redundant signals.
    fn claim_terminal(&self, signal: &'static str) -> bool {
        if self.terminal.try_enter() {
            debug!(pipeline = %self.name, signal, "pipeline terminated");
            true
        } else {
            self.metrics.record_redundant_terminal();
            trace!(pipeline = %self.name, signal, "ignoring redundant terminal signal");
            false
        }
    }

    fn succeed(&self) {
        self.record_resolution();
        self.notifier.succeed();
    }

    fn fail(&self, error: BridgeError) {
        self.record_resolution();
        self.notifier.fail(error);
    }

    #[inline]
    fn record_resolution(&self) {
        #[cfg(debug_assertions)]
        {
            let previous = self.resolutions.fetch_add(1, Ordering::Relaxed);
            debug_assert_resolved_once!(previous);
        }
    }

    fn on_drain(&self) {
        debug!(pipeline = %self.name, "sink drained");
        if !self.terminal.is_terminal() {
            self.request_one(true);
        }
    }

    /// Terminal failure originating at the sink boundary. The upstream is
    /// cancelled since nothing it emits can be written any more.
    fn on_sink_failure(&self, error: BridgeError) {
        if !self.claim_terminal("sink-error") {
            return;
        }
        warn!(pipeline = %self.name, error = %error, "sink failed");
        if let Some(subscription) = self.release_subscription() {
            subscription.cancel();
        }
        self.fail(error);
    }
}

/// Builder for [`WriteStreamSubscriber`].
///
/// Sink callbacks are registered in [`build`](Self::build), before any
/// subscription exists.
pub struct SubscriberBuilder<K, N, V> {
    sink: Arc<K>,
    notifier: N,
    converter: V,
    name: Arc<str>,
    metrics: Option<Arc<BridgeMetrics>>,
}

impl<K, N, V> SubscriberBuilder<K, N, V>
where
    K: WriteSink + 'static,
    N: CompletionNotifier + 'static,
    V: ChunkConverter<Buffer = K::Buffer>,
{
    /// Replaces the chunk converter.
    pub fn converter<V2>(self, converter: V2) -> SubscriberBuilder<K, N, V2>
    where
        V2: ChunkConverter<Buffer = K::Buffer>,
    {
        SubscriberBuilder {
            sink: self.sink,
            notifier: self.notifier,
            converter,
            name: self.name,
            metrics: self.metrics,
        }
    }

    /// Names the pipeline in log output.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Records into an existing metrics instance instead of a fresh one.
    pub fn metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Creates the adapter and registers its drain and error callbacks.
    pub fn build(self) -> WriteStreamSubscriber<K, N, V> {
        let shared = Arc::new(Shared {
            name: self.name,
            notifier: self.notifier,
            terminal: TerminalGuard::new(),
            demand: DemandGate::new(),
            subscription: Mutex::new(None),
            metrics: self.metrics.unwrap_or_default(),
            #[cfg(debug_assertions)]
            resolutions: AtomicUsize::new(0),
        });

        let weak: Weak<Shared<N>> = Arc::downgrade(&shared);
        self.sink.on_drain(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_drain();
            }
        }));

        let weak: Weak<Shared<N>> = Arc::downgrade(&shared);
        self.sink.on_error(Box::new(move |error: BoxError| {
            if let Some(shared) = weak.upgrade() {
                shared.on_sink_failure(BridgeError::Sink(error));
            }
        }));

        debug!(pipeline = %shared.name, "sink callbacks registered");

        WriteStreamSubscriber {
            sink: self.sink,
            converter: self.converter,
            shared,
        }
    }
}

/// Bridges a demand-driven publisher to a [`WriteSink`].
///
/// # Flow control
///
/// One unit is requested on subscribe. After each chunk is written the sink's
/// fullness is checked: if it can take more, one more unit is requested;
/// otherwise demand resumes when the sink's drain callback fires. At most one
/// unit is outstanding at any time.
///
/// # Terminal outcomes
///
/// | signal            | sink `end()` | notifier            | upstream |
/// |-------------------|--------------|---------------------|----------|
/// | `on_complete`     | yes          | `succeed`           | -        |
/// | [`cancel`]        | yes          | `succeed`           | cancelled|
/// | `on_error`        | no           | `fail(Upstream)`    | -        |
/// | sink error        | no           | `fail(Sink)`        | cancelled|
/// | conversion error  | no           | `fail(Conversion)`  | cancelled|
///
/// Only the first terminal signal has any effect; later ones are dropped.
///
/// [`cancel`]: WriteStreamSubscriber::cancel
pub struct WriteStreamSubscriber<K, N, V> {
    sink: Arc<K>,
    converter: V,
    shared: Arc<Shared<N>>,
}

impl<K, N> WriteStreamSubscriber<K, N, Passthrough<K::Buffer>>
where
    K: WriteSink + 'static,
    N: CompletionNotifier + 'static,
{
    /// Creates an adapter whose chunks are already in the sink's buffer type.
    ///
    /// Registers the sink's drain and error callbacks immediately.
    pub fn new(sink: Arc<K>, notifier: N) -> Self {
        Self::builder(sink, notifier).build()
    }

    /// Starts a builder for an adapter over `sink` resolving `notifier`.
    pub fn builder(sink: Arc<K>, notifier: N) -> SubscriberBuilder<K, N, Passthrough<K::Buffer>> {
        SubscriberBuilder {
            sink,
            notifier,
            converter: Passthrough::new(),
            name: Arc::from(DEFAULT_NAME),
            metrics: None,
        }
    }
}

impl<K, N, V> WriteStreamSubscriber<K, N, V>
where
    K: WriteSink + 'static,
    N: CompletionNotifier + 'static,
    V: ChunkConverter<Buffer = K::Buffer>,
{
    /// Returns the wrapped sink.
    pub fn delegate(&self) -> &Arc<K> {
        &self.sink
    }

    /// Stops the pipeline as a controlled, successful finish.
    ///
    /// Cancels the upstream subscription if one is held, ends the sink and
    /// resolves the notifier with success. Idempotent: no effect once any
    /// terminal outcome has been reached.
    pub fn cancel(&self) {
        if !self.shared.claim_terminal("cancel") {
            return;
        }
        if let Some(subscription) = self.shared.release_subscription() {
            subscription.cancel();
        }
        self.sink.end();
        self.shared.succeed();
    }

    /// Returns `true` once a terminal outcome has been reported.
    pub fn is_terminated(&self) -> bool {
        self.shared.terminal.is_terminal()
    }

    /// Returns `true` while a subscription handle is held.
    pub fn is_subscribed(&self) -> bool {
        self.shared.current_subscription().is_some()
    }

    /// Current demand state.
    pub fn demand_state(&self) -> DemandState {
        self.shared.demand.load()
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.shared.metrics
    }
}

impl<K, N, V> Subscriber<V::Chunk> for WriteStreamSubscriber<K, N, V>
where
    K: WriteSink + 'static,
    N: CompletionNotifier + 'static,
    V: ChunkConverter<Buffer = K::Buffer>,
{
    fn on_subscribe(&self, subscription: SubscriptionHandle) {
        let shared = &self.shared;
        if shared.terminal.is_terminal() {
            debug!(pipeline = %shared.name, "subscribed after terminal; cancelling");
            subscription.cancel();
            return;
        }

        {
            let mut slot = shared
                .subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                drop(slot);
                warn!(pipeline = %shared.name, "already subscribed; cancelling second subscription");
                subscription.cancel();
                return;
            }
            *slot = Some(subscription);
        }

        // A terminal signal may have released the slot before we filled it.
        if shared.terminal.is_terminal() {
            if let Some(subscription) = shared.release_subscription() {
                subscription.cancel();
            }
            return;
        }

        debug!(pipeline = %shared.name, "subscribed");
        shared.request_one(false);
    }

    fn on_next(&self, chunk: V::Chunk) {
        let shared = &self.shared;
        if shared.terminal.is_terminal() {
            shared.metrics.record_drop();
            trace!(pipeline = %shared.name, "dropping chunk received after terminal");
            return;
        }

        let _previous = shared.demand.consume();
        #[cfg(debug_assertions)]
        debug_assert_demand_outstanding!(_previous);

        let buffer = match self.converter.convert(chunk) {
            Ok(buffer) => buffer,
            Err(error) => {
                shared.metrics.record_drop();
                shared.on_sink_failure(BridgeError::Conversion(error));
                return;
            }
        };

        self.sink.write(buffer);
        shared.metrics.record_forward();

        if self.sink.is_full() {
            shared.metrics.record_pause();
            trace!(pipeline = %shared.name, "sink full; waiting for drain");
        } else {
            shared.request_one(false);
        }
    }

    fn on_error(&self, error: BoxError) {
        let shared = &self.shared;
        if !shared.claim_terminal("upstream-error") {
            return;
        }
        shared.release_subscription();
        debug!(pipeline = %shared.name, error = %error, "upstream failed");
        shared.fail(BridgeError::Upstream(error));
    }

    fn on_complete(&self) {
        let shared = &self.shared;
        if !shared.claim_terminal("complete") {
            return;
        }
        shared.release_subscription();
        self.sink.end();
        shared.succeed();
    }
}
