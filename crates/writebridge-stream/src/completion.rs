//! Oneshot completion: a [`CompletionNotifier`] paired with a future.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{ready, Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;
use writebridge::{BridgeError, CompletionNotifier};

use pin_project_lite::pin_project;

type Outcome = Result<(), BridgeError>;

/// Creates a linked notifier/future pair.
///
/// The future resolves with the first outcome the notifier receives, or with
/// [`BridgeError::Abandoned`] if the notifier is dropped unresolved.
pub fn completion() -> (CompletionSender, CompletionFuture) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSender {
            tx: Mutex::new(Some(tx)),
        },
        CompletionFuture { rx },
    )
}

/// Notifier half of [`completion`].
///
/// Only the first `succeed`/`fail` is delivered; later calls are ignored.
#[derive(Debug)]
pub struct CompletionSender {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl CompletionSender {
    fn resolve(&self, outcome: Outcome) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match tx {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    trace!("completion future dropped before resolution");
                }
            }
            None => trace!("completion already resolved"),
        }
    }

    /// Returns `true` once an outcome has been sent.
    pub fn is_resolved(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl CompletionNotifier for CompletionSender {
    fn succeed(&self) {
        self.resolve(Ok(()));
    }

    fn fail(&self, error: BridgeError) {
        self.resolve(Err(error));
    }
}

pin_project! {
    /// Future half of [`completion`].
    #[must_use = "futures do nothing unless polled"]
    pub struct CompletionFuture {
        #[pin]
        rx: oneshot::Receiver<Outcome>,
    }
}

impl Future for CompletionFuture {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(self.project().rx.poll(cx)) {
            Ok(outcome) => Poll::Ready(outcome),
            Err(_) => Poll::Ready(Err(BridgeError::Abandoned)),
        }
    }
}
