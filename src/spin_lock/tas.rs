use std::hint::spin_loop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::atomic::AtomicConsume;

use crate::RawSpinLock;

/// Naive test-and-set lock: every attempt is an atomic exchange on the flag.
#[derive(Debug, Default)]
pub struct RawTas {
    flag: AtomicBool,
}

unsafe impl RawSpinLock for RawTas {
    const INIT: Self = Self {
        flag: AtomicBool::new(false),
    };

    type WaitState = ();

    fn name() -> &'static str {
        "TAS"
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
    fn wait(&self, _state: &mut ()) {
        spin_loop();
    }
}

unsafe impl lock_api::RawMutex for RawTas {
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

unsafe impl lock_api::RawMutexTimed for RawTas {
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
