//! Credit state machine pacing upstream demand.
//!
//! At most one unit of demand is ever outstanding. The two states are:
//!
//! ```text
//!            request(1)                      on_next
//!   AwaitingDemand ──────────► DemandOutstanding ──────────► AwaitingDemand
//!        ▲   (attach, drain,                                     │
//!        │    non-full forward)                                  │
//!        └───────────────── sink full: wait for drain ◄──────────┘
//! ```
//!
//! Every transition into `DemandOutstanding` is a compare-and-swap, so a
//! drain callback racing a non-full forward issues exactly one request.

use crate::sync::{AtomicU8, Ordering};

const AWAITING_DEMAND: u8 = 0;
const DEMAND_OUTSTANDING: u8 = 1;

/// Observable demand state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandState {
    /// No request is in flight; the next request needs a trigger.
    AwaitingDemand,
    /// One unit was requested and its item has not yet arrived.
    DemandOutstanding,
}

/// Atomic cell holding a [`DemandState`].
#[derive(Debug)]
pub(crate) struct DemandGate {
    state: AtomicU8,
}

impl DemandGate {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(AWAITING_DEMAND),
        }
    }

    /// Claims the right to issue one request.
    ///
    /// Returns `true` if the caller moved the gate to `DemandOutstanding` and
    /// must now call `request(1)`; `false` if a unit is already outstanding.
    #[inline]
    pub(crate) fn try_claim(&self) -> bool {
        self.state
            .compare_exchange(
                AWAITING_DEMAND,
                DEMAND_OUTSTANDING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Consumes the outstanding unit when an item arrives.
    ///
    /// Returns the state observed before the transition so callers can
    /// detect a publisher emitting without demand.
    #[inline]
    pub(crate) fn consume(&self) -> DemandState {
        decode(self.state.swap(AWAITING_DEMAND, Ordering::AcqRel))
    }

    #[inline]
    pub(crate) fn load(&self) -> DemandState {
        decode(self.state.load(Ordering::Acquire))
    }
}

#[inline]
fn decode(raw: u8) -> DemandState {
    if raw == DEMAND_OUTSTANDING {
        DemandState::DemandOutstanding
    } else {
        DemandState::AwaitingDemand
    }
}
