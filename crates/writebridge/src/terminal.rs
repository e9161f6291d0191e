//! Single-writer-once terminal flag.

use crate::sync::{AtomicBool, Ordering};

/// Records whether a terminal outcome has been claimed.
///
/// Exactly one caller of [`TerminalGuard::try_enter`] ever observes `true`.
#[derive(Debug)]
pub(crate) struct TerminalGuard {
    terminated: AtomicBool,
}

impl TerminalGuard {
    pub(crate) fn new() -> Self {
        Self {
            terminated: AtomicBool::new(false),
        }
    }

    /// Claims the terminal transition. Returns `false` if already claimed.
    #[inline]
    pub(crate) fn try_enter(&self) -> bool {
        self.terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub(crate) fn is_terminal(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn first_enter_wins() {
        let guard = TerminalGuard::new();
        assert!(!guard.is_terminal());
        assert!(guard.try_enter());
        assert!(guard.is_terminal());
        assert!(!guard.try_enter());
    }
}

#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use super::*;
    use loom::sync::atomic::AtomicUsize;
    use loom::sync::Arc;
    use loom::thread;

    /// Completion, cancellation and a sink error racing each other resolve
    /// exactly one outcome.
    #[test]
    fn racing_terminals_resolve_once() {
        loom::model(|| {
            let guard = Arc::new(TerminalGuard::new());
            let resolved = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let g = Arc::clone(&guard);
                    let r = Arc::clone(&resolved);
                    thread::spawn(move || {
                        if g.try_enter() {
                            r.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            if guard.try_enter() {
                resolved.fetch_add(1, Ordering::Relaxed);
            }
            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(resolved.load(Ordering::Relaxed), 1);
        });
    }
}
