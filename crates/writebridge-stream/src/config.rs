//! Configuration for write queues and pipelines.

/// Configuration for [`WriteQueue`](crate::WriteQueue) flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue length at which the queue reports itself full.
    ///
    /// The limit is soft: writes beyond it are still accepted.
    ///
    /// Default: 16
    pub max_queue_size: usize,

    /// Queue length at or below which a full queue fires its drain handler.
    ///
    /// Always kept below `max_queue_size`.
    ///
    /// Default: 8
    pub low_water_mark: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(16)
    }
}

impl QueueConfig {
    /// Creates a configuration with the low-water mark at half capacity.
    pub fn new(max_queue_size: usize) -> Self {
        let max_queue_size = max_queue_size.max(1);
        Self {
            max_queue_size,
            low_water_mark: max_queue_size / 2,
        }
    }

    /// Small queue: pauses the producer early, keeps little in memory.
    pub fn low_latency() -> Self {
        Self::new(4)
    }

    /// Large queue: fewer pause/drain cycles per chunk.
    pub fn high_throughput() -> Self {
        Self::new(256)
    }

    /// Sets the capacity, clamping the low-water mark below it.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size.max(1);
        self.low_water_mark = self.low_water_mark.min(self.max_queue_size - 1);
        self
    }

    /// Sets the low-water mark, clamped below the capacity.
    pub fn with_low_water_mark(mut self, low_water_mark: usize) -> Self {
        self.low_water_mark = low_water_mark.min(self.max_queue_size - 1);
        self
    }

    /// Restores `0 ≤ low_water_mark < max_queue_size` for configs built from
    /// a struct literal.
    pub(crate) fn normalized(self) -> Self {
        let max_queue_size = self.max_queue_size.max(1);
        Self {
            max_queue_size,
            low_water_mark: self.low_water_mark.min(max_queue_size - 1),
        }
    }
}

/// Configuration for a spawned pipe.
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Pipeline name used in log output.
    ///
    /// Default: "pipe"
    pub name: String,

    /// Cancel the pipeline when its [`PipeHandle`](crate::PipeHandle) is
    /// dropped without being joined.
    ///
    /// Default: false (the pipeline runs detached)
    pub cancel_on_drop: bool,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            name: "pipe".to_owned(),
            cancel_on_drop: false,
        }
    }
}

impl PipeConfig {
    /// Sets the pipeline name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets whether dropping the handle cancels the pipeline.
    pub fn with_cancel_on_drop(mut self, cancel_on_drop: bool) -> Self {
        self.cancel_on_drop = cancel_on_drop;
        self
    }
}
