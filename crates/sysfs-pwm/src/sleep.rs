//! Tone timing.

use std::fmt;
use std::time::Duration;

/// Blocks the calling thread for the length of a tone or rest.
///
/// Playback never interrupts a sleep; stop requests are only checked once
/// it returns.
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<F> Sleeper for F
where
    F: Fn(Duration) + Send + Sync,
{
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl fmt::Debug for dyn Sleeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sleeper")
    }
}
