//! Spin-based synchronization primitives: four unfair spinlock strategies
//! behind one raw-lock trait, a generic data-carrying wrapper with timed
//! acquisition, and a single-writer/multi-reader sequence lock.

use std::time::Duration;

use quanta::{Clock, Instant};

pub mod backoff;
pub mod seq_lock;
pub mod spin_lock;

#[cfg(test)]
mod unit_test;

pub use backoff::Backoff;
pub use seq_lock::SeqLock;
pub use spin_lock::{
    CasLock, RawCas, RawTas, RawTasBackoff, RawTatas, SpinLock, SpinLockGuard, TasBackoffLock,
    TasLock, TatasLock,
};

/// Raw spinlock capability set. A raw lock is a single atomic flag plus a
/// strategy for waiting on it; the blocking and deadline-bounded acquisition
/// loops are derived here once, for every strategy.
///
/// None of the strategies record an owner: any thread may call [`unlock`],
/// and unlocking a lock that is not held is undefined behavior by contract,
/// not a detected error. No fairness is guaranteed; a waiter can starve
/// arbitrarily under adversarial scheduling.
///
/// # Safety
///
/// Implementors must guarantee mutual exclusion: between a `try_lock` that
/// returns true and the matching `unlock`, no other `try_lock` may return
/// true. Successful acquisition must have acquire ordering and `unlock`
/// release ordering, so that writes made under the lock are visible to the
/// next holder.
///
/// [`unlock`]: RawSpinLock::unlock
pub unsafe trait RawSpinLock: Send + Sync {
    /// Initial unlocked state.
    const INIT: Self;

    /// Per-acquisition wait state, private to one `lock`/`try_lock_until`
    /// call. The exponential back-off counter for [`RawTasBackoff`], `()`
    /// for the other strategies.
    type WaitState: Default;

    /// Short label for benchmarks and diagnostics.
    fn name() -> &'static str;

    /// Non-authoritative snapshot of the flag, for diagnostics and tests
    /// only.
    fn is_locked(&self) -> bool;

    /// Non-blocking: returns true iff this call moved the lock from free to
    /// held.
    fn try_lock(&self) -> bool;

    /// Release the lock. The caller must currently hold it.
    fn unlock(&self);

    /// Strategy-specific pause between failed attempts. Must return in
    /// bounded time so the timed acquisition loops can re-check their
    /// deadline.
    fn wait(&self, state: &mut Self::WaitState);

    /// Blocking: busy-wait until the lock is acquired. Never yields to the
    /// scheduler.
    fn lock(&self) {
        let mut wait_state = Self::WaitState::default();

        while !self.try_lock() {
            self.wait(&mut wait_state);
        }
    }

    /// Busy-wait until the lock is acquired or `deadline` has passed,
    /// returning whether it was acquired. The deadline is checked after each
    /// failed attempt, so one more attempt may still land at or after the
    /// deadline.
    fn try_lock_until(&self, deadline: Instant) -> bool {
        let clock = Clock::new();
        let mut wait_state = Self::WaitState::default();

        while !self.try_lock() {
            if clock.now() > deadline {
                return false;
            }

            self.wait(&mut wait_state);
        }

        true
    }

    /// Busy-wait until the lock is acquired or `timeout` has elapsed,
    /// measured from a single clock read at entry.
    fn try_lock_for(&self, timeout: Duration) -> bool {
        let clock = Clock::new();
        self.try_lock_until(clock.now() + timeout)
    }
}
