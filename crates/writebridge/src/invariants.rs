//! Debug assertion macros for adapter invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); release builds
//! pay nothing.

// =============================================================================
// Single outstanding demand unit
// =============================================================================

/// Assert that an item arrived against an outstanding request.
///
/// **Invariant**: `on_next` is only delivered while `DemandOutstanding`.
///
/// Used in: `WriteStreamSubscriber::on_next()` after consuming the credit
macro_rules! debug_assert_demand_outstanding {
    ($state:expr) => {
        debug_assert!(
            $state == $crate::demand::DemandState::DemandOutstanding,
            "publisher emitted without outstanding demand (state: {:?})",
            $state
        )
    };
}

// =============================================================================
// Completion resolved at most once
// =============================================================================

/// Assert that no earlier resolution was recorded.
///
/// **Invariant**: `resolutions_before_this_one == 0`
///
/// Used in: `Shared::record_resolution()` before notifying
macro_rules! debug_assert_resolved_once {
    ($previous:expr) => {
        debug_assert!(
            $previous == 0,
            "completion notifier resolved {} time(s) before",
            $previous
        )
    };
}

pub(crate) use debug_assert_demand_outstanding;
pub(crate) use debug_assert_resolved_once;
