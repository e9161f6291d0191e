//! Integration tests for the write-stream adapter.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use writebridge::{
    BoxError, BridgeError, CompletionNotifier, DrainHandler, ErrorHandler, Passthrough,
    Subscriber, Subscription, WriteSink, WriteStreamSubscriber,
};

// =============================================================================
// Test doubles
// =============================================================================

/// Sink with a soft queue limit. `clear_received` empties the queue and fires
/// the drain handler, like a transport flushing to the wire.
struct TestWriteStream {
    received: Mutex<Vec<String>>,
    max_size: AtomicU64,
    ends: AtomicU64,
    drain: Mutex<Option<DrainHandler>>,
    error: Mutex<Option<ErrorHandler>>,
}

impl TestWriteStream {
    fn new(max_size: u64) -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
            max_size: AtomicU64::new(max_size),
            ends: AtomicU64::new(0),
            drain: Mutex::new(None),
            error: Mutex::new(None),
        })
    }

    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn clear_received(&self) {
        self.received.lock().unwrap().clear();
        self.fire_drain();
    }

    fn fire_drain(&self) {
        if let Some(handler) = self.drain.lock().unwrap().as_ref() {
            handler();
        }
    }

    fn fire_error(&self, error: BoxError) {
        if let Some(handler) = self.error.lock().unwrap().as_ref() {
            handler(error);
        }
    }

    fn ends(&self) -> u64 {
        self.ends.load(Ordering::SeqCst)
    }

    fn has_handlers(&self) -> bool {
        self.drain.lock().unwrap().is_some() && self.error.lock().unwrap().is_some()
    }
}

impl WriteSink for TestWriteStream {
    type Buffer = String;

    fn write(&self, buffer: String) {
        self.received.lock().unwrap().push(buffer);
    }

    fn end(&self) {
        self.ends.fetch_add(1, Ordering::SeqCst);
    }

    fn is_full(&self) -> bool {
        self.received.lock().unwrap().len() as u64 >= self.max_size.load(Ordering::SeqCst)
    }

    fn on_drain(&self, handler: DrainHandler) {
        *self.drain.lock().unwrap() = Some(handler);
    }

    fn on_error(&self, handler: ErrorHandler) {
        *self.error.lock().unwrap() = Some(handler);
    }
}

/// Publisher driven by hand from the test body, tracking outstanding demand.
#[derive(Default)]
struct TestPublisher {
    requests: Mutex<Vec<u64>>,
    outstanding: AtomicU64,
    cancelled: AtomicBool,
}

impl Subscription for TestPublisher {
    fn request(&self, n: NonZeroU64) {
        self.requests.lock().unwrap().push(n.get());
        self.outstanding.fetch_add(n.get(), Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl TestPublisher {
    fn subscribe<S: Subscriber<String>>(self: &Arc<Self>, subscriber: &S) {
        subscriber.on_subscribe(Arc::clone(self) as Arc<dyn Subscription>);
    }

    fn next<S: Subscriber<String>>(&self, subscriber: &S, chunk: &str) {
        let before = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        assert!(before > 0, "emitted {chunk:?} without demand");
        subscriber.on_next(chunk.to_owned());
    }

    fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn total_requested(&self) -> u64 {
        self.requests.lock().unwrap().iter().sum()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum Outcome {
    Success,
    Failure(BridgeError),
}

#[derive(Default)]
struct RecordingNotifier {
    outcomes: Mutex<Vec<Outcome>>,
}

impl CompletionNotifier for RecordingNotifier {
    fn succeed(&self) {
        self.outcomes.lock().unwrap().push(Outcome::Success);
    }

    fn fail(&self, error: BridgeError) {
        self.outcomes.lock().unwrap().push(Outcome::Failure(error));
    }
}

impl RecordingNotifier {
    fn successes(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .filter(|o| matches!(o, Outcome::Success))
            .count()
    }

    fn take(&self) -> Vec<Outcome> {
        std::mem::take(&mut *self.outcomes.lock().unwrap())
    }
}

#[derive(Debug, PartialEq)]
struct TestError(&'static str);

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for TestError {}

type Adapter = WriteStreamSubscriber<TestWriteStream, Arc<RecordingNotifier>, Passthrough<String>>;

fn setup(max_size: u64) -> (Arc<TestWriteStream>, Arc<RecordingNotifier>, Adapter) {
    let sink = TestWriteStream::new(max_size);
    let notifier = Arc::new(RecordingNotifier::default());
    let adapter = WriteStreamSubscriber::new(Arc::clone(&sink), Arc::clone(&notifier));
    (sink, notifier, adapter)
}

// =============================================================================
// Construction and attachment
// =============================================================================

#[test]
fn test_registers_handlers_on_construction() {
    let (sink, _notifier, _adapter) = setup(8);
    assert!(sink.has_handlers());
}

#[test]
fn test_delegate_returns_sink() {
    let (sink, _notifier, adapter) = setup(8);
    assert!(Arc::ptr_eq(adapter.delegate(), &sink));
}

#[test]
fn test_requests_one_on_subscribe() {
    let (_sink, _notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());

    publisher.subscribe(&adapter);

    assert_eq!(*publisher.requests.lock().unwrap(), vec![1]);
    assert!(adapter.is_subscribed());
}

#[test]
fn test_drain_before_subscribe_is_noop() {
    let (sink, notifier, adapter) = setup(8);

    sink.fire_drain();

    assert_eq!(adapter.metrics().demand_requested(), 0);
    assert!(notifier.take().is_empty());

    // Attaching afterwards still starts the pump normally.
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);
    assert_eq!(publisher.outstanding(), 1);
}

// =============================================================================
// Demand pacing
// =============================================================================

#[test]
fn test_writes_and_requests_on_next() {
    let (sink, _notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    publisher.next(&adapter, "test");

    assert_eq!(sink.received(), vec!["test"]);
    assert_eq!(publisher.outstanding(), 1);
}

#[test]
fn test_never_full_requests_n_plus_one() {
    let (sink, _notifier, adapter) = setup(u64::MAX);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    let chunks: Vec<String> = (0..50).map(|i| format!("chunk-{i}")).collect();
    for chunk in &chunks {
        publisher.next(&adapter, chunk);
    }

    assert!(publisher.total_requested() >= 51);
    assert_eq!(sink.received(), chunks);
    assert!(publisher.requests.lock().unwrap().iter().all(|&n| n == 1));
}

#[test]
fn test_does_not_request_when_full() {
    let (sink, _notifier, adapter) = setup(1);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    publisher.next(&adapter, "only");

    assert_eq!(publisher.outstanding(), 0);
    assert_eq!(adapter.metrics().snapshot().backpressure_pauses, 1);

    sink.clear_received();
    assert_eq!(publisher.outstanding(), 1);
    assert_eq!(publisher.total_requested(), 2);
    assert_eq!(adapter.metrics().snapshot().drain_requests, 1);
}

#[test]
fn test_repeated_drain_requests_once() {
    let (sink, _notifier, adapter) = setup(1);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);
    publisher.next(&adapter, "a");

    sink.clear_received();
    sink.fire_drain();
    sink.fire_drain();

    assert_eq!(publisher.outstanding(), 1);
}

#[test]
fn test_complete_flow() {
    let (sink, notifier, adapter) = setup(2);
    let publisher = Arc::new(TestPublisher::default());

    publisher.subscribe(&adapter);
    assert_eq!(publisher.outstanding(), 1);

    publisher.next(&adapter, "first");
    assert_eq!(publisher.outstanding(), 1);

    publisher.next(&adapter, "second");
    assert_eq!(publisher.outstanding(), 0);
    assert_eq!(sink.received(), vec!["first", "second"]);

    sink.clear_received();
    assert_eq!(publisher.outstanding(), 1);

    publisher.next(&adapter, "third");
    assert_eq!(sink.received(), vec!["third"]);

    adapter.on_complete();
    assert_eq!(sink.ends(), 1);
    assert_eq!(notifier.successes(), 1);
}

// =============================================================================
// Terminal outcomes
// =============================================================================

#[test]
fn test_complete_without_chunks() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    adapter.on_complete();

    assert_eq!(sink.ends(), 1);
    assert_eq!(notifier.successes(), 1);
    assert!(adapter.is_terminated());
    assert!(!adapter.is_subscribed());
}

#[test]
fn test_cancel_ends_sink_and_succeeds() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    adapter.cancel();

    assert_eq!(sink.ends(), 1);
    assert_eq!(notifier.successes(), 1);
    assert!(publisher.is_cancelled());
}

#[test]
fn test_cancel_is_idempotent() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    adapter.cancel();
    adapter.cancel();
    adapter.cancel();

    assert_eq!(sink.ends(), 1);
    assert_eq!(notifier.take().len(), 1);
}

#[test]
fn test_cancel_after_complete_is_noop() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    adapter.on_complete();
    adapter.cancel();

    assert_eq!(sink.ends(), 1);
    assert_eq!(notifier.take().len(), 1);
    assert!(!publisher.is_cancelled());
    assert_eq!(adapter.metrics().snapshot().redundant_terminals, 1);
}

#[test]
fn test_upstream_error_fails_without_ending_sink() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);
    publisher.next(&adapter, "one");

    adapter.on_error(Box::new(TestError("test")));

    assert_eq!(sink.ends(), 0);
    let outcomes = notifier.take();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        Outcome::Failure(BridgeError::Upstream(e)) => {
            assert_eq!(e.downcast_ref::<TestError>(), Some(&TestError("test")));
        }
        other => panic!("expected upstream failure, got {other:?}"),
    }
}

#[test]
fn test_error_after_complete_does_not_overwrite_success() {
    let (_sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    adapter.on_complete();
    adapter.on_error(Box::new(TestError("late")));

    let outcomes = notifier.take();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], Outcome::Success));
}

#[test]
fn test_sink_error_fails_and_cancels_upstream() {
    let (sink, notifier, adapter) = setup(8);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    sink.fire_error(Box::new(TestError("connection reset")));

    assert!(publisher.is_cancelled());
    assert_eq!(sink.ends(), 0);
    let outcomes = notifier.take();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        Outcome::Failure(err @ BridgeError::Sink(_)) => {
            assert!(err.is_sink_side());
            assert_eq!(err.to_string(), "sink write failed: connection reset");
        }
        other => panic!("expected sink failure, got {other:?}"),
    }

    // Completion racing behind the sink error is suppressed.
    adapter.on_complete();
    assert_eq!(sink.ends(), 0);
    assert!(notifier.take().is_empty());
}

#[test]
fn test_sink_error_before_subscribe() {
    let (sink, notifier, adapter) = setup(8);

    sink.fire_error(Box::new(TestError("refused")));

    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);

    assert!(publisher.is_cancelled());
    assert_eq!(publisher.total_requested(), 0);
    assert_eq!(notifier.take().len(), 1);
}

#[test]
fn test_drain_after_terminal_does_not_request() {
    let (sink, _notifier, adapter) = setup(1);
    let publisher = Arc::new(TestPublisher::default());
    publisher.subscribe(&adapter);
    publisher.next(&adapter, "a");

    adapter.cancel();
    sink.clear_received();

    assert_eq!(publisher.total_requested(), 1);
}

#[test]
fn test_callbacks_after_adapter_dropped_are_ignored() {
    let (sink, notifier, adapter) = setup(8);
    drop(adapter);

    sink.fire_drain();
    sink.fire_error(Box::new(TestError("gone")));

    assert!(notifier.take().is_empty());
}

#[test]
fn test_concurrent_terminals_resolve_once() {
    for _ in 0..100 {
        let (sink, notifier, adapter) = setup(8);
        let adapter = Arc::new(adapter);
        let publisher = Arc::new(TestPublisher::default());
        publisher.subscribe(adapter.as_ref());

        let handles = vec![
            {
                let a = Arc::clone(&adapter);
                std::thread::spawn(move || a.cancel())
            },
            {
                let a = Arc::clone(&adapter);
                std::thread::spawn(move || a.on_complete())
            },
            {
                let a = Arc::clone(&adapter);
                std::thread::spawn(move || a.on_error(Box::new(TestError("race"))))
            },
            {
                let s = Arc::clone(&sink);
                std::thread::spawn(move || s.fire_error(Box::new(TestError("sink"))))
            },
        ];
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(notifier.take().len(), 1);
        assert!(sink.ends() <= 1);
    }
}
