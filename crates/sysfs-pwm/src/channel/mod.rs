//! PWM channel handles.
//!
//! A [`PwmChannel`] stands for one output of one controller. All device
//! writes go through a [`ChannelGuard`], which holds the channel lock, so
//! two threads can never interleave writes on the same channel. The
//! convenience methods on [`PwmChannel`] take the lock for a single call;
//! longer sequences (a whole tune) hold the guard across calls instead.

mod output;

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::device::PwmDevice;
use crate::error::{PwmError, PwmResult};
use crate::sleep::Sleeper;

use output::EnabledOutput;

/// Identity of a channel: controller directory plus channel index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId {
    controller: PathBuf,
    index: u32,
}

impl ChannelId {
    /// Creates an id from a resolved controller path and index.
    pub fn new(controller: impl Into<PathBuf>, index: u32) -> Self {
        Self {
            controller: controller.into(),
            index,
        }
    }

    /// Controller directory, e.g. `/sys/class/pwm/pwmchip0`.
    pub fn controller(&self) -> &Path {
        &self.controller
    }

    /// Channel index within the controller.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Channel directory, present only while the channel is exported.
    pub fn path(&self) -> PathBuf {
        self.controller.join(format!("pwm{}", self.index))
    }

    fn attr(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<PWM @ {}/pwm{}>", self.controller.display(), self.index)
    }
}

/// Converts a frequency in Hz to a period in nanoseconds.
///
/// # Examples
/// ```
/// use sysfs_pwm::channel::frequency_to_period_ns;
///
/// assert_eq!(frequency_to_period_ns(440.0).unwrap() as u64, 2272727);
/// assert!(frequency_to_period_ns(0.0).is_err());
/// ```
pub fn frequency_to_period_ns(freq_hz: f64) -> PwmResult<f64> {
    if !freq_hz.is_finite() || freq_hz <= 0.0 {
        return Err(PwmError::InvalidFrequency { freq: freq_hz });
    }
    let period = (1.0 / freq_hz) * 1e9;
    if !period.is_finite() {
        return Err(PwmError::InvalidFrequency { freq: freq_hz });
    }
    Ok(period)
}

fn check_duty_cycle(duty_cycle: f64) -> PwmResult<()> {
    if !(0.0..=1.0).contains(&duty_cycle) {
        return Err(PwmError::InvalidDutyCycle { duty_cycle });
    }
    Ok(())
}

fn tone_duration(duration_secs: f64) -> PwmResult<Duration> {
    Duration::try_from_secs_f64(duration_secs).map_err(|_| PwmError::InvalidDuration {
        duration: duration_secs,
    })
}

/// Handle for a single PWM channel.
///
/// Handles are shared through [`crate::ChannelRegistry`], which hands out
/// the same `Arc` for every request of the same [`ChannelId`].
#[derive(Debug)]
pub struct PwmChannel {
    id: ChannelId,
    device: Arc<dyn PwmDevice>,
    sleeper: Arc<dyn Sleeper>,
    default_duty_cycle: f64,
    lock: Mutex<()>,
    stop_requested: AtomicBool,
    playing: AtomicBool,
}

impl PwmChannel {
    pub(crate) fn new(
        id: ChannelId,
        device: Arc<dyn PwmDevice>,
        sleeper: Arc<dyn Sleeper>,
        default_duty_cycle: f64,
    ) -> Self {
        Self {
            id,
            device,
            sleeper,
            default_duty_cycle,
            lock: Mutex::new(()),
            stop_requested: AtomicBool::new(false),
            playing: AtomicBool::new(false),
        }
    }

    /// Returns the channel identity.
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Channel directory path.
    pub fn path(&self) -> PathBuf {
        self.id.path()
    }

    /// Duty cycle fraction used by `play_tone`.
    pub fn default_duty_cycle(&self) -> f64 {
        self.default_duty_cycle
    }

    /// Takes exclusive control of the channel, blocking until it is free.
    ///
    /// The lock is not re-entrant: while a thread holds the guard it must
    /// use the guard's methods, not the convenience methods on this handle.
    pub fn lock(&self) -> ChannelGuard<'_> {
        let lock = self.lock.lock();
        debug!("entering context for {}", self.id);
        ChannelGuard {
            channel: self,
            _lock: lock,
        }
    }

    /// Asks the current playback to stop after the tone in progress.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Returns true if a stop has been requested and not yet reset.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Returns true while a sequencer holds the channel.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Returns true if the channel directory exists. Does not take the lock.
    pub fn is_exported(&self) -> bool {
        self.device.is_dir(&self.id.path())
    }

    /// See [`ChannelGuard::export`].
    pub fn export(&self) -> PwmResult<()> {
        self.lock().export()
    }

    /// See [`ChannelGuard::unexport`].
    pub fn unexport(&self) -> PwmResult<()> {
        self.lock().unexport()
    }

    /// See [`ChannelGuard::enable`].
    pub fn enable(&self) -> PwmResult<()> {
        self.lock().enable()
    }

    /// See [`ChannelGuard::disable`].
    pub fn disable(&self) -> PwmResult<()> {
        self.lock().disable()
    }

    /// See [`ChannelGuard::set_duty_cycle`].
    pub fn set_duty_cycle(&self, period_ns: u64, duty_cycle: f64) -> PwmResult<()> {
        self.lock().set_duty_cycle(period_ns, duty_cycle)
    }

    /// See [`ChannelGuard::set_period`].
    pub fn set_period(&self, period_ns: u64, duty_cycle: f64) -> PwmResult<()> {
        self.lock().set_period(period_ns, duty_cycle)
    }

    /// See [`ChannelGuard::set_frequency`].
    pub fn set_frequency(&self, freq_hz: f64, duty_cycle: f64) -> PwmResult<()> {
        self.lock().set_frequency(freq_hz, duty_cycle)
    }

    /// See [`ChannelGuard::play_tone`].
    pub fn play_tone(&self, freq_hz: f64, duration_secs: f64) -> PwmResult<()> {
        self.lock().play_tone(freq_hz, duration_secs)
    }
}

/// Exclusive access to a [`PwmChannel`]; released on drop.
pub struct ChannelGuard<'a> {
    channel: &'a PwmChannel,
    _lock: MutexGuard<'a, ()>,
}

impl ChannelGuard<'_> {
    /// Returns the channel identity.
    pub fn id(&self) -> &ChannelId {
        &self.channel.id
    }

    /// Returns true if the channel directory exists.
    pub fn is_exported(&self) -> bool {
        self.channel.is_exported()
    }

    fn write(&self, path: PathBuf, payload: &[u8]) -> PwmResult<()> {
        self.channel
            .device
            .write_attr(&path, payload)
            .map_err(|source| PwmError::device(path, source))
    }

    fn write_attr(&self, name: &str, payload: &[u8]) -> PwmResult<()> {
        self.write(self.channel.id.attr(name), payload)
    }

    /// Exports the channel unless its directory already exists.
    pub fn export(&self) -> PwmResult<()> {
        debug!("exporting {}", self.channel.id);
        if !self.is_exported() {
            let path = self.channel.id.controller.join("export");
            self.write(path, format!("{}\n", self.channel.id.index).as_bytes())?;
        }
        Ok(())
    }

    /// Unexports the channel if its directory exists.
    pub fn unexport(&self) -> PwmResult<()> {
        debug!("unexporting {}", self.channel.id);
        if self.is_exported() {
            let path = self.channel.id.controller.join("unexport");
            self.write(path, format!("{}\n", self.channel.id.index).as_bytes())?;
        }
        Ok(())
    }

    /// Turns the output on.
    pub fn enable(&self) -> PwmResult<()> {
        self.write_attr("enable", b"1\n")
    }

    /// Turns the output off. Always writes, even if already disabled.
    pub fn disable(&self) -> PwmResult<()> {
        self.write_attr("enable", b"0\n")
    }

    /// Sets the active time to `duty_cycle * period_ns`, truncated.
    ///
    /// Fails with [`PwmError::InvalidDutyCycle`] without writing anything
    /// unless `0 <= duty_cycle <= 1`.
    pub fn set_duty_cycle(&self, period_ns: u64, duty_cycle: f64) -> PwmResult<()> {
        self.write_duty_cycle(period_ns as f64, duty_cycle)
    }

    fn write_duty_cycle(&self, period_ns: f64, duty_cycle: f64) -> PwmResult<()> {
        check_duty_cycle(duty_cycle)?;
        let active_ns = (duty_cycle * period_ns) as u64;
        self.write_attr("duty_cycle", active_ns.to_string().as_bytes())
    }

    /// Sets the period in nanoseconds, then the duty cycle against it.
    ///
    /// Most drivers refuse a period shorter than the current duty cycle, so
    /// the duty cycle is first reset to zero. That reset is allowed to fail:
    /// some drivers also reject it when period and duty cycle are both
    /// already zero.
    pub fn set_period(&self, period_ns: u64, duty_cycle: f64) -> PwmResult<()> {
        self.write_period(period_ns as f64, duty_cycle)
    }

    fn write_period(&self, period_ns: f64, duty_cycle: f64) -> PwmResult<()> {
        check_duty_cycle(duty_cycle)?;

        if let Err(err) = self.write_duty_cycle(0.0, 0.0) {
            debug!("ignoring duty cycle reset failure on {}: {}", self.channel.id, err);
        }

        self.write_attr("period", (period_ns as u64).to_string().as_bytes())?;
        self.write_duty_cycle(period_ns, duty_cycle)
    }

    /// Sets the period from a frequency in Hz.
    ///
    /// A zero frequency has no period; callers wanting silence should treat
    /// it as a rest, as [`ChannelGuard::play_tone`] does.
    pub fn set_frequency(&self, freq_hz: f64, duty_cycle: f64) -> PwmResult<()> {
        let period_ns = frequency_to_period_ns(freq_hz)?;
        self.write_period(period_ns, duty_cycle)
    }

    /// Plays one tone on the calling thread.
    ///
    /// A frequency of zero is a rest: the call sleeps without touching the
    /// device. Otherwise output is enabled for `duration_secs` and then
    /// disabled, including when the sleep unwinds.
    pub fn play_tone(&self, freq_hz: f64, duration_secs: f64) -> PwmResult<()> {
        let duration = tone_duration(duration_secs)?;

        if freq_hz == 0.0 {
            self.channel.sleeper.sleep(duration);
            return Ok(());
        }

        self.set_frequency(freq_hz, self.channel.default_duty_cycle)?;

        let output = EnabledOutput::enable(self)?;
        self.channel.sleeper.sleep(duration);
        output.disable()
    }
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        debug!("leaving context for {}", self.channel.id);
    }
}

impl fmt::Debug for ChannelGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelGuard")
            .field("channel", &self.channel.id)
            .finish()
    }
}
