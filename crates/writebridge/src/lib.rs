//! Demand-to-Drain Flow Control
//!
//! Bridges a pull-based publisher of chunks (demand signalled through
//! `request(n)`) to a push-based sink that reports its own readiness through
//! a level-triggered `is_full()` and an edge-triggered drain callback.
//!
//! # Features
//!
//! - **Credit pacing**: at most one unit of upstream demand is outstanding;
//!   demand is renewed after a write unless the sink is full, and resumes on
//!   drain
//! - **Exactly-once completion**: the [`CompletionNotifier`] sees one success
//!   or one failure, guarded by an atomic compare-and-set
//! - **Ordered forwarding**: chunks reach the sink in arrival order, moved
//!   rather than copied
//! - **Thread-agnostic**: callbacks may arrive from any thread; no operation
//!   blocks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use writebridge::{Subscriber, WriteStreamSubscriber};
//!
//! let adapter = Arc::new(WriteStreamSubscriber::new(sink, notifier));
//! publisher.subscribe(adapter.clone());
//!
//! // Later, from the owner:
//! adapter.cancel();
//! ```
//!
//! The `writebridge-stream` crate provides tokio-based collaborators: a
//! stream-backed publisher, an in-memory write queue sink and a oneshot
//! completion.

mod convert;
mod demand;
mod error;
mod invariants;
mod metrics;
mod notifier;
mod sink;
mod subscriber;
mod subscription;
mod sync;
mod terminal;

pub use convert::{ChunkConverter, FnConverter, Passthrough};
pub use demand::DemandState;
pub use error::{BoxError, BridgeError};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use notifier::CompletionNotifier;
pub use sink::{DrainHandler, ErrorHandler, WriteSink};
pub use subscriber::{SubscriberBuilder, WriteStreamSubscriber};
pub use subscription::{Subscriber, Subscription, SubscriptionHandle, ONE};
