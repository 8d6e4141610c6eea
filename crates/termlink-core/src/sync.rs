//! Synchronization between the engine thread and the render thread.
//!
//! With a plain mutex, the engine thread can release and immediately
//! re-acquire the lock in a tight callback loop and the render thread may
//! never get a turn. [`FairMutex`] prevents that starvation with two locks:
//! a `next` lock that serializes access requests and a `data` lock that
//! protects the state. A thread wanting the lock takes `next`, then `data`,
//! then releases `next`; any thread already waiting on `next` is guaranteed
//! the following turn.
//!
//! The sanctioned access pattern is [`FairMutex::with`]: a scoped
//! acquisition that applies a closure to the guarded state and releases the
//! lock on every exit path, including panics. Guard-returning variants
//! exist for callers that need to hold the lock across several statements.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;

/// A fair mutex guarding the state shared between exactly two long-lived
/// threads.
pub struct FairMutex<T> {
    /// The protected data.
    data: Mutex<T>,
    /// Serializes access requests to ensure fairness.
    next: Mutex<()>,
}

impl<T> FairMutex<T> {
    /// Creates a new `FairMutex` containing `data`.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
            next: Mutex::new(()),
        }
    }

    /// Acquires the lock fairly.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        // Must bind to a temporary or the lock will be freed before
        // acquiring data.lock()
        let _next = self.next.lock();
        self.data.lock()
    }

    /// Applies `f` to the guarded state under a scoped fair acquisition.
    ///
    /// The lock is released when `f` returns or unwinds.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Tries to acquire the lock fairly without blocking.
    ///
    /// Returns `None` if either the fairness queue or the data lock is
    /// held.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let _next = self.next.try_lock()?;
        self.data.try_lock()
    }

    /// Acquires the lock without the fairness guarantee.
    ///
    /// Heavy use can starve threads locking fairly.
    #[inline]
    pub fn lock_unfair(&self) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    /// Tries to acquire the data lock without blocking and without
    /// checking the fairness queue.
    #[inline]
    pub fn try_lock_unfair(&self) -> Option<MutexGuard<'_, T>> {
        self.data.try_lock()
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// The mutable borrow statically guarantees no lock is held.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the mutex, returning the underlying data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Whether the data lock is currently held by any thread.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.data.is_locked()
    }
}

impl<T: Default> Default for FairMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for FairMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock_unfair() {
            Some(guard) => f.debug_struct("FairMutex").field("data", &*guard).finish(),
            None => f
                .debug_struct("FairMutex")
                .field("data", &"<locked>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_and_read() {
        let mutex = FairMutex::new(42);
        assert_eq!(*mutex.lock(), 42);
    }

    #[test]
    fn scoped_access_mutates() {
        let mutex = FairMutex::new(Vec::new());
        mutex.with(|v| v.push(1));
        mutex.with(|v| v.push(2));
        assert_eq!(*mutex.lock(), vec![1, 2]);
    }

    #[test]
    fn try_lock_respects_holders() {
        let mutex = FairMutex::new(0);
        {
            let _guard = mutex.lock();
            assert!(mutex.try_lock().is_none());
            assert!(mutex.is_locked());
        }
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn lock_released_after_panic_in_with() {
        let mutex = Arc::new(FairMutex::new(0));
        let clone = Arc::clone(&mutex);
        let result = thread::spawn(move || {
            clone.with(|_| panic!("boom"));
        })
        .join();
        assert!(result.is_err());
        // parking_lot mutexes are not poisoned; the lock must be free.
        assert_eq!(*mutex.lock(), 0);
    }

    #[test]
    fn contended_increments() {
        let mutex = Arc::new(FairMutex::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let mutex = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    mutex.with(|n| *n += 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*mutex.lock(), 4000);
    }
}
