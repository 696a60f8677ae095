//! Background tune playback.
//!
//! Each call to [`Sequencer::play`] starts one thread that:
//!
//! 1. takes the channel lock (blocking while anyone else holds it),
//! 2. clears the channel's stop flag,
//! 3. plays each tone in order, checking the stop flag between tones,
//! 4. disables output, even if a tone failed or panicked,
//! 5. releases the lock,
//! 6. runs the completion callback, if any.
//!
//! Stop requests never cut a tone short. Two playbacks on one channel are
//! serialized end to end by the lock; playbacks on different channels share
//! nothing.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{info, warn};

use crate::channel::{ChannelGuard, ChannelId, PwmChannel};
use crate::error::{PwmError, PwmResult};
use crate::tune::Tune;

/// Callback run once a playback finishes, after the channel is released.
pub type CompletionCallback = Box<dyn FnOnce(&PwmResult<PlaybackSummary>) + Send + 'static>;

/// Outcome of a playback that ran to completion or was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Channel the tune was played on.
    pub channel: ChannelId,
    /// Tones (rests included) that were played.
    pub tones_played: usize,
    /// True if a stop request skipped the remaining tones.
    pub stopped_early: bool,
}

/// Plays tunes on one channel.
#[derive(Debug, Clone)]
pub struct Sequencer {
    channel: Arc<PwmChannel>,
}

impl Sequencer {
    /// Creates a sequencer for `channel`.
    pub fn new(channel: Arc<PwmChannel>) -> Self {
        Self { channel }
    }

    /// Returns the channel this sequencer drives.
    pub fn channel(&self) -> &Arc<PwmChannel> {
        &self.channel
    }

    /// Starts playing `tune` in the background.
    pub fn play(&self, tune: Tune) -> PwmResult<Playback> {
        self.spawn(tune, None)
    }

    /// Starts playing `tune` and runs `callback` once playback ends.
    pub fn play_with_callback<F>(&self, tune: Tune, callback: F) -> PwmResult<Playback>
    where
        F: FnOnce(&PwmResult<PlaybackSummary>) + Send + 'static,
    {
        self.spawn(tune, Some(Box::new(callback)))
    }

    /// Plays `tune` and blocks until it has finished.
    pub fn play_and_wait(&self, tune: Tune) -> PwmResult<PlaybackSummary> {
        self.play(tune)?.wait()
    }

    /// Requests that the current playback stop after its current tone.
    pub fn stop(&self) {
        self.channel.request_stop();
    }

    fn spawn(&self, tune: Tune, callback: Option<CompletionCallback>) -> PwmResult<Playback> {
        let channel = self.channel.clone();
        let handle = std::thread::Builder::new()
            .name(format!("pwm-tune-{}", channel.id().index()))
            .spawn(move || {
                let result = run_tune(&channel, &tune);
                match &result {
                    Ok(summary) => info!(
                        "finished tune on {}: {} of {} tones{}",
                        summary.channel,
                        summary.tones_played,
                        tune.len(),
                        if summary.stopped_early { " (stopped)" } else { "" }
                    ),
                    Err(err) => warn!("tune on {} failed: {}", channel.id(), err),
                }
                if let Some(callback) = callback {
                    callback(&result);
                }
                result
            })
            .map_err(PwmError::Spawn)?;

        Ok(Playback {
            channel: self.channel.clone(),
            handle,
        })
    }
}

/// A running (or finished) playback.
#[derive(Debug)]
pub struct Playback {
    channel: Arc<PwmChannel>,
    handle: JoinHandle<PwmResult<PlaybackSummary>>,
}

impl Playback {
    /// Returns the channel being played.
    pub fn channel(&self) -> &Arc<PwmChannel> {
        &self.channel
    }

    /// Requests a stop after the current tone.
    pub fn stop(&self) {
        self.channel.request_stop();
    }

    /// Returns true once the playback thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until playback ends and returns its outcome.
    pub fn wait(self) -> PwmResult<PlaybackSummary> {
        let Playback { channel, handle } = self;
        handle.join().unwrap_or_else(|_| {
            Err(PwmError::PlaybackPanicked {
                channel: channel.id().to_string(),
            })
        })
    }
}

/// Clears the playing flag when playback ends, including on unwind.
struct PlayingFlag<'a>(&'a PwmChannel);

impl<'a> PlayingFlag<'a> {
    fn raise(channel: &'a PwmChannel) -> Self {
        channel.set_playing(true);
        Self(channel)
    }
}

impl Drop for PlayingFlag<'_> {
    fn drop(&mut self) {
        self.0.set_playing(false);
    }
}

fn run_tune(channel: &PwmChannel, tune: &Tune) -> PwmResult<PlaybackSummary> {
    let guard = channel.lock();
    channel.clear_stop();
    let playing = PlayingFlag::raise(channel);
    info!("playing {} tones on {}", tune.len(), channel.id());

    let played = panic::catch_unwind(AssertUnwindSafe(|| play_tones(channel, &guard, tune)))
        .unwrap_or_else(|payload| {
            warn!("tone on {} panicked: {}", channel.id(), panic_message(&*payload));
            Err(PwmError::PlaybackPanicked {
                channel: channel.id().to_string(),
            })
        });

    let disabled = guard.disable();
    drop(playing);
    drop(guard);

    let (tones_played, stopped_early) = played?;
    disabled?;
    Ok(PlaybackSummary {
        channel: channel.id().clone(),
        tones_played,
        stopped_early,
    })
}

/// Plays tones until the tune ends or a stop is seen. Returns the number
/// played and whether a stop skipped any.
fn play_tones(
    channel: &PwmChannel,
    guard: &ChannelGuard<'_>,
    tune: &Tune,
) -> PwmResult<(usize, bool)> {
    let mut tones_played = 0;
    for tone in tune {
        guard.play_tone(tone.frequency_hz(), tone.duration_secs())?;
        tones_played += 1;
        if channel.stop_requested() {
            return Ok((tones_played, tones_played < tune.len()));
        }
    }
    Ok((tones_played, false))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
