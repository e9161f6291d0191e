//! Async reader implementing `futures::Stream` over a write queue.

use crate::queue::WriteQueue;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;

/// Consuming side of a [`WriteQueue`].
///
/// Yields buffers in write order and ends after the queue's `end()` once
/// everything queued has been read. Reading is what relieves backpressure:
/// popping the queue down to its low-water mark fires the drain handler.
///
/// Dropping the reader before the queue ends reports
/// [`QueueError::Closed`](crate::QueueError::Closed) to the queue's error
/// handler.
pub struct WriteQueueReader<T> {
    queue: Arc<WriteQueue<T>>,
}

impl<T> WriteQueueReader<T> {
    pub(crate) fn new(queue: Arc<WriteQueue<T>>) -> Self {
        Self { queue }
    }

    /// Returns the queue this reader consumes.
    pub fn queue(&self) -> &Arc<WriteQueue<T>> {
        &self.queue
    }

    /// Number of buffers waiting to be read.
    pub fn buffered_count(&self) -> usize {
        self.queue.len()
    }
}

impl<T> Stream for WriteQueueReader<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.queue.poll_pop(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.queue.len(), None)
    }
}

impl<T> Drop for WriteQueueReader<T> {
    fn drop(&mut self) {
        self.queue.close_reader();
    }
}
