//! Counters describing how an adapter paced its pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe adapter counters (relaxed atomics).
///
/// Shared through `Arc` so the owner can observe a live adapter.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    chunks_forwarded: AtomicU64,
    chunks_dropped: AtomicU64,
    demand_requested: AtomicU64,
    drain_requests: AtomicU64,
    backpressure_pauses: AtomicU64,
    redundant_terminals: AtomicU64,
}

/// Point-in-time copy of [`BridgeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Chunks written to the sink.
    pub chunks_forwarded: u64,
    /// Chunks received after the terminal state, or that failed conversion.
    pub chunks_dropped: u64,
    /// Total units of demand requested from upstream.
    pub demand_requested: u64,
    /// Demand units issued from the drain callback.
    pub drain_requests: u64,
    /// Forwards after which the sink reported full.
    pub backpressure_pauses: u64,
    /// Terminal signals ignored because the pipeline was already terminal.
    pub redundant_terminals: u64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_forwarded: self.chunks_forwarded.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            demand_requested: self.demand_requested.load(Ordering::Relaxed),
            drain_requests: self.drain_requests.load(Ordering::Relaxed),
            backpressure_pauses: self.backpressure_pauses.load(Ordering::Relaxed),
            redundant_terminals: self.redundant_terminals.load(Ordering::Relaxed),
        }
    }

    pub fn demand_requested(&self) -> u64 {
        self.demand_requested.load(Ordering::Relaxed)
    }

    pub fn chunks_forwarded(&self) -> u64 {
        self.chunks_forwarded.load(Ordering::Relaxed)
    }

    pub(crate) fn record_forward(&self) {
        self.chunks_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request(&self, from_drain: bool) {
        self.demand_requested.fetch_add(1, Ordering::Relaxed);
        if from_drain {
            self.drain_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_pause(&self) {
        self.backpressure_pauses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_redundant_terminal(&self) {
        self.redundant_terminals.fetch_add(1, Ordering::Relaxed);
    }
}
