//! Cross-process synchronization point between matrix steps.
//!
//! Two independently started processes run complementary matrices. They
//! have no channel to each other, so each one waits at a [`Barrier`]
//! before every step after the first. [`SleepBarrier`] waits a fixed
//! wall-clock pause; a rendezvous-based implementation can replace it
//! without touching the transfer code.

use std::time::Duration;

use crate::matrix::MatrixStep;

/// Default pause between matrix steps.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

pub trait Barrier {
    /// Block until the peer is presumed ready for `next`.
    fn wait(&mut self, next: &MatrixStep);
}

/// Waits a fixed pause, ignoring which step comes next.
#[derive(Debug, Clone, Copy)]
pub struct SleepBarrier {
    pause: Duration,
}

impl SleepBarrier {
    #[must_use]
    pub const fn new(pause: Duration) -> Self {
        Self { pause }
    }

    #[must_use]
    pub const fn pause(&self) -> Duration {
        self.pause
    }
}

impl Default for SleepBarrier {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE)
    }
}

impl Barrier for SleepBarrier {
    fn wait(&mut self, _next: &MatrixStep) {
        if !self.pause.is_zero() {
            std::thread::sleep(self.pause);
        }
    }
}

impl<B: Barrier + ?Sized> Barrier for &mut B {
    fn wait(&mut self, next: &MatrixStep) {
        (**self).wait(next);
    }
}
