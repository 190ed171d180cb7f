//! Data-carrying spinlock generic over a raw locking strategy.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use quanta::Instant;

use crate::RawSpinLock;

pub mod cas;
pub mod tas;
pub mod tas_eb;
pub mod tatas;

pub use cas::RawCas;
pub use tas::RawTas;
pub use tas_eb::RawTasBackoff;
pub use tatas::RawTatas;

pub type TasLock<T> = SpinLock<T, RawTas>;
pub type TatasLock<T> = SpinLock<T, RawTatas>;
pub type TasBackoffLock<T> = SpinLock<T, RawTasBackoff>;
pub type CasLock<T> = SpinLock<T, RawCas>;

/// Mutual exclusion for `T` via busy-waiting on the raw strategy `R`.
///
/// Acquisition returns a [`SpinLockGuard`] that releases the lock on every
/// exit path of the protected scope. Suitable for short critical sections
/// only; waiters burn CPU instead of yielding to the scheduler.
pub struct SpinLock<T, R: RawSpinLock> {
    lock: R,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send, R: RawSpinLock> Send for SpinLock<T, R> {}
unsafe impl<T: Send, R: RawSpinLock> Sync for SpinLock<T, R> {}

/// Releases the owning [`SpinLock`] when dropped.
pub struct SpinLockGuard<'s, T, R: RawSpinLock> {
    lock: &'s SpinLock<T, R>,
}

unsafe impl<'s, T: Sync, R: RawSpinLock> Sync for SpinLockGuard<'s, T, R> {}

impl<T, R: RawSpinLock> SpinLock<T, R> {
    pub const fn new(data: T) -> Self {
        Self {
            lock: R::INIT,
            data: UnsafeCell::new(data),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Exclusive access through `&mut self` needs no locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Non-authoritative snapshot of the flag, for diagnostics and tests
    /// only.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Busy-wait until the lock is acquired.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T, R> {
        self.lock.lock();

        SpinLockGuard { lock: self }
    }

    /// Attempt the lock once, without waiting.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T, R>> {
        if self.lock.try_lock() {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Busy-wait until the lock is acquired or `deadline` has passed. The
    /// deadline is checked after each failed attempt, so one more attempt
    /// may still land at or after the deadline.
    #[inline]
    pub fn try_lock_until(&self, deadline: Instant) -> Option<SpinLockGuard<'_, T, R>> {
        if self.lock.try_lock_until(deadline) {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Busy-wait until the lock is acquired or `timeout` has elapsed,
    /// measured once at entry.
    #[inline]
    pub fn try_lock_for(&self, timeout: Duration) -> Option<SpinLockGuard<'_, T, R>> {
        if self.lock.try_lock_for(timeout) {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Release the lock without a guard, for callers that acquired through
    /// [`lock`](Self::lock) and then `mem::forget` the guard.
    ///
    /// # Safety
    ///
    /// The lock must be held, and no guard for it may be live. Releasing a
    /// lock another thread holds hands out aliased mutable access to the
    /// data.
    pub unsafe fn force_unlock(&self) {
        self.lock.unlock();
    }
}

impl<T: Default, R: RawSpinLock> Default for SpinLock<T, R> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, R: RawSpinLock> fmt::Debug for SpinLock<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("strategy", &R::name())
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl<'s, T, R: RawSpinLock> Deref for SpinLockGuard<'s, T, R> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'s, T, R: RawSpinLock> DerefMut for SpinLockGuard<'s, T, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'s, T, R: RawSpinLock> Drop for SpinLockGuard<'s, T, R> {
    fn drop(&mut self) {
        self.lock.lock.unlock();
    }
}
