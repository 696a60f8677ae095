//! Error types for PWM channel control and tune playback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for PWM operations.
pub type PwmResult<T> = Result<T, PwmError>;

/// Errors that can occur while driving a PWM channel.
#[derive(Debug, Error)]
pub enum PwmError {
    /// Duty cycle fraction outside `[0, 1]`.
    #[error("Invalid duty cycle {duty_cycle}: expected 0 <= duty_cycle <= 1")]
    InvalidDutyCycle {
        /// The rejected fraction.
        duty_cycle: f64,
    },

    /// Frequency that cannot be converted to a period.
    #[error("Invalid frequency: {freq} Hz (must be finite and greater than zero)")]
    InvalidFrequency {
        /// The rejected frequency.
        freq: f64,
    },

    /// Tone duration that cannot be slept for.
    #[error("Invalid duration: {duration} seconds")]
    InvalidDuration {
        /// The rejected duration.
        duration: f64,
    },

    /// Writing a control attribute failed.
    #[error("Failed to write {path}: {source}")]
    Device {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tune contents are unusable.
    #[error("Invalid tune: {message}")]
    InvalidTune { message: String },

    /// Tune JSON could not be parsed.
    #[error("Failed to parse tune: {0}")]
    ParseTune(#[source] serde_json::Error),

    /// The playback thread could not be started.
    #[error("Failed to spawn playback thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A tone or the completion callback panicked.
    #[error("Playback on {channel} panicked")]
    PlaybackPanicked { channel: String },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PwmError {
    /// Creates a device write error for the given attribute path.
    pub fn device(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Device {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid tune error.
    pub fn invalid_tune(message: impl Into<String>) -> Self {
        Self::InvalidTune {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if this error came from the device interface.
    pub fn is_device(&self) -> bool {
        matches!(self, PwmError::Device { .. })
    }

    /// Stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            PwmError::InvalidDutyCycle { .. } => "PWM_001",
            PwmError::InvalidFrequency { .. } => "PWM_002",
            PwmError::InvalidDuration { .. } => "PWM_003",
            PwmError::Device { .. } => "PWM_004",
            PwmError::InvalidTune { .. } => "PWM_005",
            PwmError::ParseTune(_) => "PWM_006",
            PwmError::Spawn(_) => "PWM_007",
            PwmError::PlaybackPanicked { .. } => "PWM_008",
            PwmError::InvalidConfig { .. } => "PWM_009",
        }
    }

    /// Error category for grouping related errors.
    pub fn category(&self) -> &'static str {
        match self {
            PwmError::InvalidDutyCycle { .. }
            | PwmError::InvalidFrequency { .. }
            | PwmError::InvalidDuration { .. } => "argument",
            PwmError::Device { .. } => "device",
            PwmError::InvalidTune { .. } | PwmError::ParseTune(_) => "tune",
            PwmError::Spawn(_) | PwmError::PlaybackPanicked { .. } => "playback",
            PwmError::InvalidConfig { .. } => "config",
        }
    }
}
