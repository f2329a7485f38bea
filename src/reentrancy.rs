//! Debug-only reentrancy guard.
//!
//! A table calls out to user code while hashing keys. If that code reaches
//! back into the same table in the middle of an operation, the chains can
//! be observed half-linked. Debug builds panic on such nested entry;
//! release builds compile the tracker to nothing.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table tracker. Public table methods start with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    // Same auto traits in every build: movable between threads, never
    // shared without a lock.
    _unsync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _unsync: PhantomData,
        }
    }

    /// Enters a guarded section. Debug builds panic if one is already open.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrancy detected: nested call into a ByteTable");
            self.depth.set(d + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes the section opened by [`DebugReentrancy::enter`] on drop.
pub(crate) struct ReentrancyGuard<'g> {
    #[cfg(debug_assertions)]
    owner: &'g DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'g ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_sections_are_fine() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_section_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic in debug builds");
        // The outer guard was released during unwinding.
        let _g = r.enter();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_section_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _outer = r.enter();
        let _inner = r.enter();
    }

    #[test]
    fn tracker_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DebugReentrancy>();
    }
}
