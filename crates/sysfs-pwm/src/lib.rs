//! sysfs-pwm
//!
//! Control for Linux sysfs PWM channels, plus a sequencer that plays tunes
//! (lists of frequency/duration pairs) on a background thread. Typical use
//! is driving a piezo buzzer from a single-board computer's hardware PWM.
//!
//! # Overview
//!
//! - [`ChannelRegistry`] hands out one shared [`PwmChannel`] per
//!   controller/index pair.
//! - [`PwmChannel`] exports, enables and configures the channel. Every write
//!   goes through the channel lock.
//! - [`Sequencer`] plays a [`Tune`] while holding that lock, checking for
//!   stop requests between tones and always disabling output at the end.
//!
//! # Device layout
//!
//! For controller `/sys/class/pwm/pwmchip0` and channel `0`:
//!
//! | Attribute | Payload |
//! |-----------|---------|
//! | `pwmchip0/export`, `pwmchip0/unexport` | channel index + newline |
//! | `pwm0/enable` | `1\n` or `0\n` |
//! | `pwm0/period` | nanoseconds |
//! | `pwm0/duty_cycle` | active nanoseconds |
//!
//! # Example
//!
//! ```no_run
//! use sysfs_pwm::{ChannelRegistry, Sequencer, Tune};
//!
//! let registry = ChannelRegistry::new();
//! let buzzer = registry.channel("pwmchip0", 0);
//! buzzer.export()?;
//!
//! let tune = Tune::from_pairs([(440.0, 0.2), (0.0, 0.1), (523.0, 0.2)])?;
//! let playback = Sequencer::new(buzzer).play(tune)?;
//! // ...
//! playback.stop();
//! let summary = playback.wait()?;
//! println!("played {} tones", summary.tones_played);
//! # Ok::<(), sysfs_pwm::PwmError>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`channel`] - Channel handles and the locked operation set
//! - [`registry`] - One handle per physical channel
//! - [`sequencer`] - Background tune playback
//! - [`tune`] - Tone and tune model, JSON parsing
//! - [`device`] - Sysfs and in-memory device implementations
//! - [`config`] - Registry configuration
//! - [`error`] - Error types

pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod registry;
pub mod sequencer;
pub mod sleep;
pub mod tune;

use std::path::Path;

// Re-export main types at crate root
pub use channel::{ChannelGuard, ChannelId, PwmChannel};
pub use config::PwmConfig;
pub use device::{DeviceWrite, MemoryDevice, PwmDevice, SysfsDevice};
pub use error::{PwmError, PwmResult};
pub use registry::ChannelRegistry;
pub use sequencer::{Playback, PlaybackSummary, Sequencer};
pub use sleep::{Sleeper, ThreadSleeper};
pub use tune::{Tone, ToneValue, Tune};

/// Plays `tune` on a channel and waits for it to finish.
///
/// The channel is exported first if needed.
pub fn play(
    registry: &ChannelRegistry,
    controller: impl AsRef<Path>,
    index: u32,
    tune: &Tune,
) -> PwmResult<PlaybackSummary> {
    let channel = registry.channel(controller, index);
    channel.export()?;
    Sequencer::new(channel).play_and_wait(tune.clone())
}
