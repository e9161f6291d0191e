//! Wiring a fallible stream into a sink through the write-stream adapter.

use crate::completion::{completion, CompletionFuture};
use crate::config::PipeConfig;
use crate::publisher::StreamPublisher;
use futures_core::Stream;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use writebridge::{BoxError, BridgeError, BridgeMetrics, Passthrough, WriteSink, WriteStreamSubscriber};

/// Writes every item of `stream` into `sink`, paced by the sink's flow
/// control, and resolves with the pipeline's terminal outcome.
///
/// The sink is ended on success. Must be called within a tokio runtime.
pub async fn pipe<S, T, E, K>(stream: S, sink: Arc<K>) -> Result<(), BridgeError>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Into<K::Buffer> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
    K: WriteSink + 'static,
{
    spawn_pipe(stream, sink, PipeConfig::default()).join().await
}

/// Starts a pipeline from `stream` into `sink` and returns a handle to
/// observe or cancel it.
///
/// Must be called within a tokio runtime.
pub fn spawn_pipe<S, T, E, K>(stream: S, sink: Arc<K>, config: PipeConfig) -> PipeHandle
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Into<K::Buffer> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
    K: WriteSink + 'static,
{
    let (notifier, completion) = completion();
    let metrics = Arc::new(BridgeMetrics::new());

    let adapter = Arc::new(
        WriteStreamSubscriber::builder(sink, notifier)
            .converter(Passthrough::<T, K::Buffer>::new())
            .name(config.name.as_str())
            .metrics(Arc::clone(&metrics))
            .build(),
    );

    let task = StreamPublisher::new(stream)
        .with_name(config.name.clone())
        .subscribe(adapter.clone());

    debug!(pipeline = %config.name, "pipe started");

    let canceller = Canceller(Arc::new(move || adapter.cancel()));
    PipeHandle {
        name: config.name,
        canceller,
        metrics,
        completion: Some(completion),
        task: Some(task),
        cancel_on_drop: config.cancel_on_drop,
    }
}

/// Cloneable trigger that cancels a running pipe.
///
/// Cancellation is a successful finish: the sink is ended and the pipe
/// resolves `Ok(())`. Only the first call has effect.
#[derive(Clone)]
pub struct Canceller(Arc<dyn Fn() + Send + Sync>);

impl Canceller {
    pub fn cancel(&self) {
        (self.0)();
    }
}

impl std::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Canceller")
    }
}

/// Handle to a pipeline started by [`spawn_pipe`].
pub struct PipeHandle {
    name: String,
    canceller: Canceller,
    metrics: Arc<BridgeMetrics>,
    completion: Option<CompletionFuture>,
    task: Option<JoinHandle<()>>,
    cancel_on_drop: bool,
}

impl PipeHandle {
    /// Cancels the pipeline. See [`Canceller`].
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Returns a cloneable cancellation trigger.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Live adapter counters.
    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// Waits for the terminal outcome and for the publisher task to exit.
    pub async fn join(mut self) -> Result<(), BridgeError> {
        let outcome = match self.completion.take() {
            Some(completion) => completion.await,
            None => Err(BridgeError::Abandoned),
        };
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(pipeline = %self.name, error = %e, "publisher task did not finish cleanly");
            }
        }
        debug!(pipeline = %self.name, ok = outcome.is_ok(), "pipe finished");
        outcome
    }
}

impl Drop for PipeHandle {
    fn drop(&mut self) {
        if self.cancel_on_drop && self.completion.is_some() {
            debug!(pipeline = %self.name, "pipe handle dropped; cancelling");
            self.canceller.cancel();
        }
    }
}
