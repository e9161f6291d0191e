//! Atomic shims: loom's model-checked atomics under `--features loom` unit
//! tests, `std` everywhere else.

#[cfg(not(all(feature = "loom", test)))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[cfg(all(feature = "loom", test))]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicU8, Ordering};
