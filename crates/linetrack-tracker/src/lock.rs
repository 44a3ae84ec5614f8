use std::cell::Cell;

use parking_lot::ReentrantMutex;

/// Reentrant lock guarding the tracker state.
///
/// A thread holding the lock may acquire it again, which lets handler
/// notifications raised under the lock call back into the tracker. The guarded
/// value is only reachable through a shared reference, so mutable state inside
/// it uses `Cell` / `RefCell`.
pub(crate) struct TrackerLock<T> {
    inner: ReentrantMutex<Locked<T>>,
}

struct Locked<T> {
    depth: Cell<usize>,
    value: T,
}

/// Decrements the hold depth when a `with` scope ends, including on unwind.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<T> TrackerLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(Locked {
                depth: Cell::new(0),
                value,
            }),
        }
    }

    /// Run `f` with the lock held, blocking until it is available.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.lock();
        guard.depth.set(guard.depth.get() + 1);
        let _depth = DepthGuard(&guard.depth);
        f(&guard.value)
    }

    /// Whether the calling thread currently holds the lock.
    pub(crate) fn is_held_by_current_thread(&self) -> bool {
        // try_lock succeeds when the lock is free or already ours; only in the
        // latter case has an enclosing `with` raised the depth.
        self.inner
            .try_lock()
            .is_some_and(|guard| guard.depth.get() > 0)
    }
}
