//! Exponential back-off between failed lock attempts.

use std::sync::atomic::{fence, Ordering};

const INITIAL: u32 = 1 << 9;
const CEILING: u32 = (1 << 20) - 1;

/// Exponential back-off counter, local to one acquisition call.
///
/// Each [`pause`](Backoff::pause) burns the current window as a run of
/// acquire-release fences, then doubles the window up to [`CEILING`]. A
/// fresh counter starts at [`INITIAL`]; acquisition loops reset it simply by
/// constructing a new one.
#[derive(Debug)]
pub struct Backoff {
    window: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self { window: INITIAL }
    }

    /// Busy-wait for the current window, then widen it.
    #[inline]
    pub fn pause(&mut self) {
        for _ in 0..self.window {
            fence(Ordering::AcqRel);
        }

        if self.window < CEILING {
            self.window <<= 1;
        }
    }

    /// Current window size, in fence iterations.
    #[inline]
    pub fn window(&self) -> u32 {
        self.window
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
