//! Per-slot test-and-set lock.
//!
//! Each bag slot is protected by one of these. The remove path only ever
//! uses [`TasLock::try_lock`]; a failed attempt makes the caller release
//! its own lock and move to another slot, which is what keeps `remove_any`
//! deadlock-free. The blocking [`TasLock::lock`] spins and exists for
//! single-lock call sites only; it is never nested.

use crate::sync::{spin_pause, AtomicBool, Ordering};

pub(crate) struct TasLock {
    locked: AtomicBool,
}

impl TasLock {
    pub(crate) fn new() -> Self {
        TasLock {
            locked: AtomicBool::new(false),
        }
    }

    /// Non-blocking acquire. Returns `true` on success.
    #[inline]
    pub(crate) fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Blocking acquire. Spins until the lock is free.
    #[allow(dead_code)]
    #[inline]
    pub(crate) fn lock(&self) {
        while !self.try_lock() {
            spin_pause();
        }
    }

    /// Release. The caller must hold the lock.
    #[inline]
    pub(crate) fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn try_lock_is_exclusive() {
        let lock = TasLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
        lock.unlock();
    }

    #[test]
    fn blocking_lock_acquires_free_lock() {
        let lock = TasLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        lock.unlock();
    }
}
