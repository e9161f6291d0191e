//! Push-side collaborator: a sink with level-triggered fullness and an
//! edge-triggered drain notification.

use crate::error::BoxError;

/// Callback fired when a previously full sink regains capacity.
pub type DrainHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Callback fired when the sink's write path fails.
pub type ErrorHandler = Box<dyn Fn(BoxError) + Send + Sync + 'static>;

/// A push-based consumer of buffers.
///
/// All methods take `&self`: sinks are shared between the adapter and the
/// transport that owns them, and none of the operations may block.
///
/// # Flow control
///
/// `write` always accepts the buffer; the sink queues it internally.
/// `is_full` reports whether that queue has reached capacity. Once a full
/// sink falls back below its low-water mark it invokes the drain handler
/// exactly once per full → ready transition.
pub trait WriteSink: Send + Sync {
    /// The sink's native buffer type.
    type Buffer: Send;

    /// Queues a buffer for writing. Ownership moves into the sink.
    fn write(&self, buffer: Self::Buffer);

    /// Signals that no more buffers will follow.
    fn end(&self);

    /// Returns `true` while the write queue is at or above capacity.
    fn is_full(&self) -> bool;

    /// Registers the drain handler, replacing any previous one.
    fn on_drain(&self, handler: DrainHandler);

    /// Registers the error handler, replacing any previous one.
    fn on_error(&self, handler: ErrorHandler);
}
