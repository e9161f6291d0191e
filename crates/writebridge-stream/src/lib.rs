//! Tokio Collaborators for writebridge
//!
//! This crate provides the async pieces around the
//! [`WriteStreamSubscriber`](writebridge::WriteStreamSubscriber) adapter,
//! enabling `futures::Stream` sources to be written into flow-controlled
//! sinks with a single awaitable outcome.
//!
//! # Features
//!
//! - **Demand-driven publishing**: [`StreamPublisher`] pulls from a stream only
//!   against requested credit, on its own tokio task
//! - **Flow-controlled sink**: [`WriteQueue`] reports fullness at a soft
//!   capacity and fires drain at a low-water mark; [`WriteQueueReader`]
//!   consumes it as a `Stream`
//! - **Oneshot completion**: [`completion`] pairs a notifier with a future
//!   resolving to `Result<(), BridgeError>`
//! - **Pipes**: [`pipe`] and [`spawn_pipe`] wire all of the above together,
//!   with cancellation and live metrics
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use writebridge_stream::{pipe, write_queue, QueueConfig, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (queue, mut reader) = write_queue::<Bytes>(QueueConfig::new(2));
//!     let chunks = futures::stream::iter(
//!         ["first", "second", "third"].map(|s| Ok::<_, std::io::Error>(Bytes::from(s))),
//!     );
//!
//!     let consumer = tokio::spawn(async move {
//!         while let Some(buf) = reader.next().await {
//!             println!("wrote {} bytes", buf.len());
//!         }
//!     });
//!
//!     pipe(chunks, queue).await.unwrap();
//!     consumer.await.unwrap();
//! }
//! ```

mod completion;
mod config;
mod credit;
mod error;
mod invariants;
mod pipe;
mod publisher;
mod queue;
mod reader;

pub use completion::{completion, CompletionFuture, CompletionSender};
pub use config::{PipeConfig, QueueConfig};
pub use error::QueueError;
pub use pipe::{pipe, spawn_pipe, Canceller, PipeHandle};
pub use publisher::StreamPublisher;
pub use queue::{byte_queue, write_queue, ByteQueue, WriteQueue};
pub use reader::WriteQueueReader;

// Re-export useful stream combinators
pub use futures_util::StreamExt;
