//! Reentrant screen lock with freeze/thaw.
//!
//! Guards raw access to the screen from paths outside the server task. The
//! owning thread may lock again without blocking. [`ScreenLock::freeze`]
//! hands the lock back entirely, whatever the nesting depth, and
//! [`ScreenLock::thaw`] restores that depth later.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
pub struct ScreenLock {
    state: Mutex<LockState>,
    released: Condvar,
}

/// One level of the lock; dropping it releases that level.
#[derive(Debug)]
#[must_use = "the lock is released when the guard is dropped"]
pub struct ScreenGuard<'a> {
    lock: &'a ScreenLock,
}

/// Nesting depth handed back by [`ScreenLock::freeze`].
#[derive(Debug)]
#[must_use = "a frozen lock must be thawed"]
pub struct Frozen {
    depth: usize,
}

impl ScreenLock {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Acquire one level, waiting while another thread holds the lock.
    pub fn lock(&self) -> ScreenGuard<'_> {
        self.acquire(1);
        ScreenGuard { lock: self }
    }

    /// Release every level held by the calling thread.
    ///
    /// Returns `None` if the calling thread does not hold the lock. Guards
    /// taken before the freeze must stay alive until [`Self::thaw`].
    pub fn freeze(&self) -> Option<Frozen> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return None;
        }
        let depth = std::mem::take(&mut state.depth);
        state.owner = None;
        drop(state);
        self.released.notify_one();
        Some(Frozen { depth })
    }

    /// Reacquire the lock at the depth it had when frozen.
    pub fn thaw(&self, frozen: Frozen) { self.acquire(frozen.depth); }

    /// Current nesting depth held by the calling thread.
    #[must_use]
    pub fn depth(&self) -> usize {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) { state.depth } else { 0 }
    }

    fn acquire(&self, levels: usize) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.owner.is_some_and(|owner| owner != me) {
            self.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth += levels;
    }

    fn release(&self) {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return;
        }
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }
}

impl Drop for ScreenGuard<'_> {
    fn drop(&mut self) { self.lock.release(); }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_reentrant() {
        let lock = ScreenLock::new();
        let outer = lock.lock();
        let inner = lock.lock();
        assert_eq!(lock.depth(), 2);
        drop(inner);
        assert_eq!(lock.depth(), 1);
        drop(outer);
        assert_eq!(lock.depth(), 0);
    }

    #[test]
    fn test_freeze_requires_ownership() {
        let lock = ScreenLock::new();
        assert!(lock.freeze().is_none());
    }

    #[test]
    fn test_freeze_lets_other_threads_in() {
        let lock = Arc::new(ScreenLock::new());
        let entered = Arc::new(AtomicBool::new(false));

        let _outer = lock.lock();
        let _inner = lock.lock();

        let other = {
            let lock = Arc::clone(&lock);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _guard = lock.lock();
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!entered.load(Ordering::SeqCst));

        let frozen = lock.freeze().unwrap();
        assert_eq!(lock.depth(), 0);
        other.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));

        lock.thaw(frozen);
        assert_eq!(lock.depth(), 2);
    }
}
