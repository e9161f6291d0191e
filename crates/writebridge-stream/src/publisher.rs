//! Demand-driven publisher over a `futures::Stream`.

use crate::credit::{Credit, StreamSubscription};
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_within_credit;
use futures_core::Stream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use writebridge::{BoxError, Subscriber};

/// Publishes the items of a fallible stream to a single subscriber, pulling
/// from the stream only when the subscriber has requested demand.
///
/// The stream is driven by a tokio task spawned in
/// [`subscribe`](Self::subscribe). The task ends after delivering
/// `on_complete` or `on_error`, or as soon as the subscription is cancelled.
///
/// # Example
///
/// ```ignore
/// let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from("a"))]);
/// let task = StreamPublisher::new(chunks).subscribe(adapter);
/// ```
pub struct StreamPublisher<S> {
    stream: S,
    name: String,
}

impl<S, T, E> StreamPublisher<S>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            name: "publisher".to_owned(),
        }
    }

    /// Names the publisher in log output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches `subscriber` and starts the pump task.
    ///
    /// Must be called within a tokio runtime. `on_subscribe` runs on the
    /// spawned task before any item is pulled.
    pub fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>) -> JoinHandle<()> {
        tokio::spawn(pump(self.stream, subscriber, self.name))
    }
}

async fn pump<S, T, E>(stream: S, subscriber: Arc<dyn Subscriber<T>>, name: String)
where
    S: Stream<Item = Result<T, E>> + Send,
    E: Into<BoxError>,
{
    let credit = Arc::new(Credit::new());
    subscriber.on_subscribe(Arc::new(StreamSubscription::new(Arc::clone(&credit))));

    let stream = stream.fuse();
    futures_util::pin_mut!(stream);
    let mut emitted = 0u64;

    loop {
        if !credit.acquire().await {
            debug!(publisher = %name, emitted, "subscription cancelled");
            return;
        }

        let next = tokio::select! {
            biased;
            () = credit.cancelled() => {
                debug!(publisher = %name, emitted, "subscription cancelled while pulling");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(item)) => {
                emitted += 1;
                #[cfg(debug_assertions)]
                debug_assert_within_credit!(emitted, credit.granted());
                trace!(publisher = %name, emitted, "emitting item");
                subscriber.on_next(item);
            }
            Some(Err(error)) => {
                debug!(publisher = %name, emitted, "stream failed");
                subscriber.on_error(error.into());
                return;
            }
            None => {
                debug!(publisher = %name, emitted, "stream completed");
                subscriber.on_complete();
                return;
            }
        }
    }
}
