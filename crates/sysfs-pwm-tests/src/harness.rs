//! Shared helpers: logging, in-memory registries and test sleepers.

use std::sync::{Arc, Barrier, Once};
use std::time::Duration;

use parking_lot::Mutex;
use sysfs_pwm::{ChannelRegistry, MemoryDevice, Sleeper};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init()
            .ok();
    });
}

/// Creates a registry over a fresh [`MemoryDevice`] with the given sleeper.
pub fn memory_registry(sleeper: Arc<dyn Sleeper>) -> (ChannelRegistry, Arc<MemoryDevice>) {
    init_tracing();
    let device = Arc::new(MemoryDevice::new());
    let registry = ChannelRegistry::new()
        .with_device(device.clone())
        .with_sleeper(sleeper);
    (registry, device)
}

/// Sleeper that records requested durations without sleeping.
#[derive(Debug, Default)]
pub struct SleepLog {
    slept: Mutex<Vec<Duration>>,
}

impl SleepLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Durations requested so far, in order.
    pub fn durations(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Sleeper for SleepLog {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Sleeper whose first sleep blocks until the test releases it.
///
/// The first call meets the test at [`GatedSleeper::wait_for_sleep`], then
/// blocks until [`GatedSleeper::release`]. Later calls return immediately.
#[derive(Debug)]
pub struct GatedSleeper {
    gate: Barrier,
    calls: Mutex<usize>,
}

impl GatedSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Barrier::new(2),
            calls: Mutex::new(0),
        })
    }

    /// Blocks until the playback thread is inside its first sleep.
    pub fn wait_for_sleep(&self) {
        self.gate.wait();
    }

    /// Lets the first sleep return.
    pub fn release(&self) {
        self.gate.wait();
    }

    /// Number of sleeps requested so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl Sleeper for GatedSleeper {
    fn sleep(&self, _duration: Duration) {
        let first = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls == 1
        };
        if first {
            self.gate.wait();
            self.gate.wait();
        }
    }
}
