use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::atomic::AtomicConsume;

use crate::backoff::Backoff;
use crate::RawSpinLock;

/// Test-and-set lock with exponential back-off between failed exchanges.
/// Each waiter keeps a private [`Backoff`] window for the duration of one
/// acquisition call, trading retry latency for less traffic on the shared
/// flag under contention.
#[derive(Debug, Default)]
pub struct RawTasBackoff {
    flag: AtomicBool,
}

unsafe impl RawSpinLock for RawTasBackoff {
    const INIT: Self = Self {
        flag: AtomicBool::new(false),
    };

    type WaitState = Backoff;

    fn name() -> &'static str {
        "TAS-EB"
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

    #[inline]
    fn wait(&self, backoff: &mut Backoff) {
        backoff.pause();
    }
}

unsafe impl lock_api::RawMutex for RawTasBackoff {
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

unsafe impl lock_api::RawMutexTimed for RawTasBackoff {
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
