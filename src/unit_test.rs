use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quanta::Clock;
use serial_test::serial;

use crate::{
    CasLock, RawCas, RawSpinLock, RawTas, RawTasBackoff, RawTatas, SeqLock, SpinLock,
    TasBackoffLock, TasLock, TatasLock,
};

/// Two halves that must always be observed equal; a mismatch means a torn
/// or interleaved write got through.
#[derive(Clone, Copy, Debug, Default)]
struct Pair {
    lo: u64,
    hi: u64,
}

impl Pair {
    fn of(value: u64) -> Self {
        Pair {
            lo: value,
            hi: value,
        }
    }

    fn torn(&self) -> bool {
        self.lo != self.hi
    }
}

// (writers, readers, iterations per thread)
const LOCK_UNLOCK_PARAMS: &[(usize, usize, usize)] =
    &[(1, 2, 20_000), (2, 4, 10_000), (4, 4, 5_000)];

fn lock_unlock_inner<R: RawSpinLock + 'static>(
    num_writers: usize,
    num_readers: usize,
    num_iters: usize,
) {
    let lock = Arc::new(SpinLock::<Pair, R>::new(Pair::of(0)));
    let mut handles = vec![];

    for writer_idx in 0..num_writers {
        let lock = lock.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("writer-{writer_idx}"))
                .spawn(move || {
                    let start = (writer_idx * num_iters) as u64;
                    for i in start..start + num_iters as u64 {
                        *lock.lock() = Pair::of(i);
                    }
                })
                .unwrap(),
        );
    }

    for reader_idx in 0..num_readers {
        let lock = lock.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("reader-{reader_idx}"))
                .spawn(move || {
                    for _ in 0..num_iters {
                        let value = *lock.lock();
                        assert!(!value.torn(), "{} let through {value:?}", R::name());
                    }
                })
                .unwrap(),
        );
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(!lock.is_locked());
}

#[test]
#[serial]
fn tas_lock_unlock() {
    for &(writers, readers, iters) in LOCK_UNLOCK_PARAMS {
        lock_unlock_inner::<RawTas>(writers, readers, iters);
    }
}

#[test]
#[serial]
fn tatas_lock_unlock() {
    for &(writers, readers, iters) in LOCK_UNLOCK_PARAMS {
        lock_unlock_inner::<RawTatas>(writers, readers, iters);
    }
}

#[test]
#[serial]
fn tas_eb_lock_unlock() {
    for &(writers, readers, iters) in LOCK_UNLOCK_PARAMS {
        lock_unlock_inner::<RawTasBackoff>(writers, readers, iters);
    }
}

#[test]
#[serial]
fn cas_lock_unlock() {
    for &(writers, readers, iters) in LOCK_UNLOCK_PARAMS {
        lock_unlock_inner::<RawCas>(writers, readers, iters);
    }
}

#[test]
fn raw_lock_state_transitions() {
    fn check<R: RawSpinLock>() {
        let raw = R::INIT;
        assert!(!raw.is_locked());
        assert!(raw.try_lock());
        assert!(raw.is_locked());
        assert!(!raw.try_lock());
        raw.unlock();
        assert!(!raw.is_locked());

        raw.lock();
        assert!(raw.is_locked());
        raw.unlock();
        assert!(!raw.is_locked());
    }

    check::<RawTas>();
    check::<RawTatas>();
    check::<RawTasBackoff>();
    check::<RawCas>();
}

#[test]
fn try_lock_excludes_other_threads() {
    let lock = Arc::new(TasLock::new(0u32));
    let guard = lock.lock();
    assert!(lock.is_locked());

    {
        let lock = lock.clone();
        thread::spawn(move || {
            assert!(lock.try_lock().is_none());
            assert!(lock.is_locked());
        })
        .join()
        .unwrap();
    }

    drop(guard);
    assert!(!lock.is_locked());
    assert!(lock.try_lock().is_some());
}

/// Spawns a thread that takes the lock, flips `held`, and keeps the guard
/// for `hold`.
fn hold_lock_for<R: RawSpinLock + 'static>(
    lock: Arc<SpinLock<(), R>>,
    held: Arc<AtomicBool>,
    hold: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let guard = lock.lock();
        held.store(true, Ordering::Release);
        thread::sleep(hold);
        drop(guard);
    })
}

#[test]
#[serial]
fn timed_lock_acquires_after_early_release() {
    let lock = Arc::new(TatasLock::new(()));
    let held = Arc::new(AtomicBool::new(false));
    let holder = hold_lock_for(lock.clone(), held.clone(), Duration::from_millis(100));

    while !held.load(Ordering::Acquire) {
        thread::yield_now();
    }

    // released at a quarter of the timeout, so this acquires
    let guard = lock.try_lock_for(Duration::from_millis(400));
    assert!(guard.is_some());

    drop(guard);
    holder.join().unwrap();
}

#[test]
#[serial]
fn timed_lock_gives_up_at_deadline() {
    let clock = Clock::new();
    let lock = Arc::new(CasLock::new(()));
    let held = Arc::new(AtomicBool::new(false));
    let holder = hold_lock_for(lock.clone(), held.clone(), Duration::from_millis(600));

    while !held.load(Ordering::Acquire) {
        thread::yield_now();
    }

    let timeout = Duration::from_millis(150);
    let begin = clock.now();
    assert!(lock.try_lock_for(timeout).is_none());
    let elapsed = clock.now().duration_since(begin);

    // never gives up early, and overshoots by at most spin granularity
    assert!(elapsed >= timeout, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(450), "returned after {elapsed:?}");

    holder.join().unwrap();
}

#[test]
fn try_lock_until_on_held_lock_times_out() {
    let clock = Clock::new();
    let lock = TasBackoffLock::new(5u32);

    let guard = lock
        .try_lock_until(clock.now() + Duration::from_millis(50))
        .expect("free lock");
    assert_eq!(*guard, 5);

    assert!(lock
        .try_lock_until(clock.now() + Duration::from_millis(20))
        .is_none());
}

const BACKOFF_THREADS: usize = 16;
const BACKOFF_ITERS: usize = 2_000;

#[test]
#[serial]
fn backoff_grants_every_contender() {
    let lock = Arc::new(TasBackoffLock::new(0usize));
    let mut handles = vec![];

    for i in 0..BACKOFF_THREADS {
        let lock = lock.clone();
        handles.push(
            thread::Builder::new()
                .name(i.to_string())
                .spawn(move || {
                    for _ in 0..BACKOFF_ITERS {
                        *lock.lock() += 1;
                    }
                })
                .unwrap(),
        );
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*lock.lock(), BACKOFF_THREADS * BACKOFF_ITERS);
}

#[test]
fn seq_lock_round_trip() {
    let lock = SeqLock::new(Pair::of(7));
    assert_eq!(lock.read().lo, 7);
    assert_eq!(lock.sequence(), 0);

    lock.write(Pair::of(8));
    let value = lock.read();
    assert!(!value.torn());
    assert_eq!(value.lo, 8);
    assert_eq!(lock.sequence(), 2);

    lock.write(Pair::of(9));
    assert_eq!(lock.sequence(), 4);
    assert_eq!(lock.read().hi, 9);
}

const SEQ_READERS: usize = 4;
const SEQ_WRITES: u64 = 200_000;

#[test]
#[serial]
fn seq_lock_readers_never_observe_torn_pairs() {
    let lock = Arc::new(SeqLock::new(Pair::of(0)));
    let done = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for i in 0..SEQ_READERS {
        let lock = lock.clone();
        let done = done.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("reader-{i}"))
                .spawn(move || loop {
                    let value = lock.read();
                    assert!(!value.torn(), "torn seqlock read {value:?}");

                    if done.load(Ordering::Acquire) {
                        break;
                    }
                })
                .unwrap(),
        );
    }

    for i in 1..=SEQ_WRITES {
        lock.write(Pair::of(i));
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(lock.read().lo, SEQ_WRITES);
}

const E2E_WRITERS: usize = 4;
const E2E_READERS: usize = 16;
const E2E_ACQUISITIONS: usize = 100_000;

#[test]
#[serial]
fn cas_end_to_end_consistency() {
    let lock = Arc::new(CasLock::new(Pair::of(0)));
    let mut handles = vec![];

    for writer_idx in 0..E2E_WRITERS {
        let lock = lock.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("writer-{writer_idx}"))
                .spawn(move || {
                    let start = (writer_idx * E2E_ACQUISITIONS) as u64;
                    for i in start..start + E2E_ACQUISITIONS as u64 {
                        *lock.lock() = Pair::of(i);
                    }
                })
                .unwrap(),
        );
    }

    for reader_idx in 0..E2E_READERS {
        let lock = lock.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("reader-{reader_idx}"))
                .spawn(move || {
                    for _ in 0..E2E_ACQUISITIONS {
                        let value = *lock.lock();
                        assert!(!value.torn(), "torn read {value:?}");
                    }
                })
                .unwrap(),
        );
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let final_value = *lock.lock();
    assert!(!final_value.torn());
}

#[test]
fn lock_api_mutex_interop() {
    let mutex: lock_api::Mutex<RawTas, u64> = lock_api::Mutex::new(5);

    {
        let mut guard = mutex.lock();
        *guard += 1;
    }
    assert_eq!(*mutex.lock(), 6);

    assert!(mutex.try_lock_for(Duration::from_millis(10)).is_some());
}
