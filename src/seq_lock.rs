//! Single-writer/multi-reader sequence lock.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use crossbeam::utils::Backoff;

/// Sequence lock over a small `Copy` value.
///
/// The parity of the sequence counter encodes write-in-progress: even means
/// stable, odd means a write is in flight. Readers never block a writer;
/// they optimistically copy the slot and retry whenever the counter changed
/// (or was odd) around the copy. The counter protocol, not any atomicity of
/// the slot itself, is what rules out torn reads, so the slot is accessed
/// with volatile copies.
///
/// The design assumes a single writer per instance. Concurrent `write`
/// calls are serialized by the entry compare-and-swap, so values never tear,
/// but which writer commits last is unspecified.
pub struct SeqLock<T: Copy> {
    seq: AtomicUsize,
    value: UnsafeCell<T>,
}

unsafe impl<T: Copy + Send> Send for SeqLock<T> {}
unsafe impl<T: Copy + Send> Sync for SeqLock<T> {}

impl<T: Copy> SeqLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            seq: AtomicUsize::new(0),
            value: UnsafeCell::new(value),
        }
    }

    /// Snapshot of the sequence counter, for diagnostics and tests only.
    /// Even means no write is in flight.
    pub fn sequence(&self) -> usize {
        self.seq.load(Ordering::Acquire)
    }

    /// Store a new value. Cannot fail; if a write is already in flight the
    /// call snoozes until the counter is even again and retries its entry
    /// compare-and-swap.
    pub fn write(&self, value: T) {
        let backoff = Backoff::new();
        let mut seq0 = self.seq.load(Ordering::Relaxed);

        loop {
            if seq0 & 1 == 1 {
                backoff.snooze();
                seq0 = self.seq.load(Ordering::Relaxed);
                continue;
            }

            // Entering the write makes the counter odd, which parks readers
            // until the commit below. Acquire pairs with the previous
            // writer's committing store so slot writes never race.
            match self.seq.compare_exchange_weak(
                seq0,
                seq0.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => seq0 = observed,
            }
        }

        // Keeps the slot store from floating above the odd counter store;
        // what we want is a store(Acquire), which does not exist.
        fence(Ordering::Release);

        unsafe { ptr::write_volatile(self.value.get(), value) };

        self.seq.store(seq0.wrapping_add(2), Ordering::Release);
    }

    /// Lock-free snapshot of the value. Retries until a copy is bracketed by
    /// two identical even counter reads; unbounded under sustained write
    /// pressure.
    pub fn read(&self) -> T {
        let backoff = Backoff::new();

        loop {
            let seq0 = self.seq.load(Ordering::Acquire);

            if seq0 & 1 == 0 {
                let value = unsafe { ptr::read_volatile(self.value.get()) };

                // Keeps the re-check below from floating above the slot
                // copy; what we want is a load(Release), which does not
                // exist.
                fence(Ordering::Acquire);

                let seq1 = self.seq.load(Ordering::Relaxed);
                if seq0 == seq1 {
                    return value;
                }
            }

            backoff.snooze();
        }
    }
}

impl<T: Copy + Default> Default for SeqLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
