use std::hint::spin_loop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::atomic::AtomicConsume;

use crate::RawSpinLock;

const POLL_LIMIT: u32 = 1 << 10;

/// Test-and-test-and-set lock: between exchanges, waiters spin on a plain
/// relaxed read of the flag. The read-only spin keeps the cache line shared
/// instead of bouncing exclusive requests across cores the way repeated
/// exchanges do.
#[derive(Debug, Default)]
pub struct RawTatas {
    flag: AtomicBool,
}

unsafe impl RawSpinLock for RawTatas {
    const INIT: Self = Self {
        flag: AtomicBool::new(false),
    };

    type WaitState = ();

    fn name() -> &'static str {
        "TATAS"
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.flag.load_consume()
    }

    #[inline]
    fn try_lock(&self) -> bool {
        !self.flag.swap(true, Ordering::Acquire)
    }

    #[inline]
    fn unlock(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Read-only spin until the flag is observed free, bounded by
    /// `POLL_LIMIT` so timed acquisition keeps observing its deadline.
    #[inline]
    fn wait(&self, _state: &mut ()) {
        for _ in 0..POLL_LIMIT {
            if !self.flag.load(Ordering::Relaxed) {
                return;
            }

            spin_loop();
        }
    }
}

unsafe impl lock_api::RawMutex for RawTatas {
    const INIT: Self = <Self as RawSpinLock>::INIT;

    type GuardMarker = lock_api::GuardSend;

    #[inline]
    fn lock(&self) {
        RawSpinLock::lock(self);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        RawSpinLock::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        RawSpinLock::unlock(self);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        RawSpinLock::is_locked(self)
    }
}

unsafe impl lock_api::RawMutexTimed for RawTatas {
    type Duration = Duration;
    type Instant = quanta::Instant;

    #[inline]
    fn try_lock_for(&self, timeout: Duration) -> bool {
        RawSpinLock::try_lock_for(self, timeout)
    }

    #[inline]
    fn try_lock_until(&self, deadline: quanta::Instant) -> bool {
        RawSpinLock::try_lock_until(self, deadline)
    }
}
