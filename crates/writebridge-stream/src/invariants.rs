//! Debug assertion macros for queue and publisher invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); release builds
//! pay nothing.

// =============================================================================
// Drain fires below capacity
// =============================================================================

/// Assert that a drain is only fired once the queue is back under the
/// low-water mark, and that the mark leaves room before the queue is full
/// again.
///
/// **Invariant**: `len ≤ low_water_mark < max_queue_size`
///
/// Used in: `QueueState::take_drain()` (reached from `poll_pop()` and `clear()`)
macro_rules! debug_assert_drain_below_capacity {
    ($len:expr, $low_water:expr, $max:expr) => {
        debug_assert!(
            $len <= $low_water && $low_water < $max,
            "drain fired at len {} (low water {}, max {})",
            $len,
            $low_water,
            $max
        )
    };
}

// =============================================================================
// Emissions bounded by credit
// =============================================================================

/// Assert that the publisher emitted no more items than were requested.
///
/// **Invariant**: `emitted ≤ granted`
///
/// Used in: `StreamPublisher` pump loop before `on_next()`
macro_rules! debug_assert_within_credit {
    ($emitted:expr, $granted:expr) => {
        debug_assert!(
            $emitted <= $granted,
            "publisher emitted {} items against {} units of demand",
            $emitted,
            $granted
        )
    };
}

pub(crate) use debug_assert_drain_below_capacity;
pub(crate) use debug_assert_within_credit;
