//! In-memory write queue implementing [`WriteSink`].

use crate::config::QueueConfig;
use crate::error::QueueError;
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_drain_below_capacity;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};
use writebridge::{BoxError, DrainHandler, ErrorHandler, WriteSink};

use crate::reader::WriteQueueReader;

type SharedDrain = Arc<dyn Fn() + Send + Sync>;
type SharedError = Arc<dyn Fn(BoxError) + Send + Sync>;

/// Creates a write queue and the reader that consumes it.
///
/// # Example
///
/// ```ignore
/// use writebridge_stream::{write_queue, QueueConfig, StreamExt};
///
/// let (queue, mut reader) = write_queue::<bytes::Bytes>(QueueConfig::new(2));
/// queue.write(bytes::Bytes::from("first"));
/// assert_eq!(reader.next().await, Some(bytes::Bytes::from("first")));
/// ```
pub fn write_queue<T: Send + 'static>(config: QueueConfig) -> (Arc<WriteQueue<T>>, WriteQueueReader<T>) {
    let queue = Arc::new(WriteQueue::new(config));
    let reader = WriteQueueReader::new(Arc::clone(&queue));
    (queue, reader)
}

/// Write queue of binary chunks.
pub type ByteQueue = WriteQueue<Bytes>;

/// Creates a [`ByteQueue`] and its reader.
pub fn byte_queue(config: QueueConfig) -> (Arc<ByteQueue>, WriteQueueReader<Bytes>) {
    write_queue(config)
}

/// A push sink with a soft capacity.
///
/// # Flow control
///
/// Writes are always accepted. [`is_full`](WriteSink::is_full) reports
/// `len >= max_queue_size`. Once the queue has reported full, the drain
/// handler fires exactly once when the reader (or [`clear`](Self::clear))
/// brings the length down to `low_water_mark`.
///
/// Handlers are always invoked with the internal lock released, so they may
/// call back into the queue.
pub struct WriteQueue<T> {
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Set when the queue reports full, cleared when drain fires.
    full_latched: bool,
    ended: bool,
    /// Reader dropped.
    closed: bool,
    written: u64,
    drain_handler: Option<SharedDrain>,
    error_handler: Option<SharedError>,
    reader_waker: Option<Waker>,
}

impl<T> QueueState<T> {
    fn is_full(&self, config: &QueueConfig) -> bool {
        self.items.len() >= config.max_queue_size
    }

    /// Clears the full latch if the queue has fallen to the low-water mark,
    /// returning the drain handler to fire.
    fn take_drain(&mut self, config: &QueueConfig) -> Option<SharedDrain> {
        if self.full_latched && self.items.len() <= config.low_water_mark {
            #[cfg(debug_assertions)]
            debug_assert_drain_below_capacity!(
                self.items.len(),
                config.low_water_mark,
                config.max_queue_size
            );
            self.full_latched = false;
            self.drain_handler.clone()
        } else {
            None
        }
    }
}

impl<T> WriteQueue<T> {
    fn new(config: QueueConfig) -> Self {
        let config = config.normalized();
        Self {
            config,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(config.max_queue_size),
                full_latched: false,
                ended: false,
                closed: false,
                written: 0,
                drain_handler: None,
                error_handler: None,
                reader_waker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of buffers waiting to be read.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns `true` once `end()` has been called.
    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Total buffers accepted since creation.
    pub fn written(&self) -> u64 {
        self.lock().written
    }

    /// Discards all queued buffers, firing drain if the queue had reported
    /// full. Returns the number of buffers discarded.
    pub fn clear(&self) -> usize {
        let (cleared, drain) = {
            let mut state = self.lock();
            let cleared = state.items.len();
            state.items.clear();
            (cleared, state.take_drain(&self.config))
        };
        trace!(cleared, "write queue cleared");
        if let Some(drain) = drain {
            drain();
        }
        cleared
    }

    /// Reports a write-path failure to the registered error handler.
    pub fn fail(&self, error: impl Into<BoxError>) {
        let handler = self.lock().error_handler.clone();
        let error = error.into();
        debug!(error = %error, "write queue failed");
        if let Some(handler) = handler {
            handler(error);
        }
    }

    /// Pops the next buffer for the reader.
    pub(crate) fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut state = self.lock();
        if let Some(item) = state.items.pop_front() {
            let drain = state.take_drain(&self.config);
            drop(state);
            if let Some(drain) = drain {
                trace!("write queue drained");
                drain();
            }
            return Poll::Ready(Some(item));
        }
        if state.ended {
            return Poll::Ready(None);
        }
        state.reader_waker = Some(cx.waker().clone());
        Poll::Pending
    }

    /// Marks the reader gone. Reports [`QueueError::Closed`] if the queue had
    /// not ended, since nothing written from now on can be delivered.
    pub(crate) fn close_reader(&self) {
        let handler = {
            let mut state = self.lock();
            state.closed = true;
            state.reader_waker = None;
            if state.ended {
                None
            } else {
                state.error_handler.clone()
            }
        };
        if let Some(handler) = handler {
            debug!("write queue reader dropped before end");
            handler(Box::new(QueueError::Closed));
        }
    }
}

impl<T: Send> WriteSink for WriteQueue<T> {
    type Buffer = T;

    fn write(&self, buffer: T) {
        let mut state = self.lock();
        let rejected = if state.ended {
            Some(QueueError::WriteAfterEnd)
        } else if state.closed {
            Some(QueueError::Closed)
        } else {
            None
        };
        if let Some(error) = rejected {
            let handler = state.error_handler.clone();
            drop(state);
            trace!(error = %error, "write rejected");
            if let Some(handler) = handler {
                handler(Box::new(error));
            }
            return;
        }

        state.items.push_back(buffer);
        state.written += 1;
        if state.is_full(&self.config) {
            state.full_latched = true;
        }
        let waker = state.reader_waker.take();
        drop(state);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn end(&self) {
        let waker = {
            let mut state = self.lock();
            if state.ended {
                return;
            }
            state.ended = true;
            state.reader_waker.take()
        };
        debug!("write queue ended");
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn is_full(&self) -> bool {
        self.lock().is_full(&self.config)
    }

    fn on_drain(&self, handler: DrainHandler) {
        self.lock().drain_handler = Some(Arc::from(handler));
    }

    fn on_error(&self, handler: ErrorHandler) {
        self.lock().error_handler = Some(Arc::from(handler));
    }
}
