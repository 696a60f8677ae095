//! Tunes: ordered lists of tones to play on a channel.
//!
//! A tune can be built from numeric pairs or parsed from JSON. JSON input
//! accepts either a bare list or a `{"tones": [...]}` document; each tone is
//! a `[frequency, duration]` pair or a `{"frequency": .., "duration": ..}`
//! object, and every value may be a number or a numeric string.
//!
//! ```
//! use sysfs_pwm::Tune;
//!
//! let tune = Tune::from_json(r#"[[440, 0.1], ["0", "0.1"], [523, 0.1]]"#).unwrap();
//! assert_eq!(tune.len(), 3);
//! assert!(tune.tones()[1].is_rest());
//! ```

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PwmError, PwmResult};

/// A single tone. A frequency of zero is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    frequency_hz: f64,
    duration_secs: f64,
    #[serde(skip)]
    duration: Duration,
}

impl Tone {
    /// Creates a tone.
    ///
    /// The frequency must be finite and non-negative. The duration must be
    /// non-negative and small enough to fit in a [`Duration`], so a tone that
    /// validates here can always be slept for.
    pub fn new(frequency_hz: f64, duration_secs: f64) -> PwmResult<Self> {
        if !frequency_hz.is_finite() || frequency_hz < 0.0 {
            return Err(PwmError::invalid_tune(format!(
                "frequency must be finite and >= 0, got {}",
                frequency_hz
            )));
        }
        let duration = Duration::try_from_secs_f64(duration_secs).map_err(|_| {
            PwmError::invalid_tune(format!(
                "duration must be >= 0 and at most {} seconds, got {}",
                Duration::MAX.as_secs(),
                duration_secs
            ))
        })?;
        Ok(Self {
            frequency_hz,
            duration_secs,
            duration,
        })
    }

    /// Creates a rest of the given length.
    pub fn rest(duration_secs: f64) -> PwmResult<Self> {
        Self::new(0.0, duration_secs)
    }

    /// Frequency in Hz.
    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Duration in seconds, as given.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Returns true if this tone is silence.
    pub fn is_rest(&self) -> bool {
        self.frequency_hz == 0.0
    }

    /// Length of the tone.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Numeric types accepted by [`Tune::from_pairs`].
pub trait ToneValue {
    /// Converts to `f64`, rounding to the nearest representable value.
    fn to_f64(self) -> f64;
}

macro_rules! impl_tone_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToneValue for $ty {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_tone_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// An ordered sequence of tones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tune {
    tones: Vec<Tone>,
}

impl Tune {
    /// Creates a tune from already validated tones.
    pub fn new(tones: Vec<Tone>) -> Self {
        Self { tones }
    }

    /// Builds a tune from `(frequency, duration)` pairs.
    pub fn from_pairs<I, F, D>(pairs: I) -> PwmResult<Self>
    where
        I: IntoIterator<Item = (F, D)>,
        F: ToneValue,
        D: ToneValue,
    {
        let tones = pairs
            .into_iter()
            .map(|(freq, duration)| Tone::new(freq.to_f64(), duration.to_f64()))
            .collect::<PwmResult<Vec<_>>>()?;
        Ok(Self { tones })
    }

    /// Parses a tune from JSON.
    pub fn from_json(json: &str) -> PwmResult<Self> {
        let raw: RawTune = serde_json::from_str(json).map_err(PwmError::ParseTune)?;
        let tones = match raw {
            RawTune::List(tones) | RawTune::Document { tones } => tones,
        };
        let tones = tones
            .into_iter()
            .enumerate()
            .map(|(i, tone)| {
                tone.into_tone().map_err(|err| match err {
                    PwmError::InvalidTune { message } => {
                        PwmError::invalid_tune(format!("tone {}: {}", i, message))
                    }
                    other => other,
                })
            })
            .collect::<PwmResult<Vec<_>>>()?;
        Ok(Self { tones })
    }

    /// Tones in playback order.
    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    /// Number of tones, rests included.
    pub fn len(&self) -> usize {
        self.tones.len()
    }

    /// Returns true if the tune has no tones.
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    /// Appends a tone.
    pub fn push(&mut self, tone: Tone) {
        self.tones.push(tone);
    }

    /// Sum of all tone durations, saturating at [`Duration::MAX`].
    pub fn total_duration(&self) -> Duration {
        self.tones
            .iter()
            .fold(Duration::ZERO, |total, tone| total.saturating_add(tone.duration()))
    }

    /// Iterates tones in playback order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tone> {
        self.tones.iter()
    }
}

impl FromStr for Tune {
    type Err = PwmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl<'a> IntoIterator for &'a Tune {
    type Item = &'a Tone;
    type IntoIter = std::slice::Iter<'a, Tone>;

    fn into_iter(self) -> Self::IntoIter {
        self.tones.iter()
    }
}

impl FromIterator<Tone> for Tune {
    fn from_iter<T: IntoIterator<Item = Tone>>(iter: T) -> Self {
        Self {
            tones: iter.into_iter().collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTune {
    List(Vec<RawTone>),
    Document { tones: Vec<RawTone> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTone {
    Pair(Numeric, Numeric),
    Object {
        #[serde(alias = "freq", alias = "frequency_hz")]
        frequency: Numeric,
        #[serde(alias = "duration_secs")]
        duration: Numeric,
    },
}

impl RawTone {
    fn into_tone(self) -> PwmResult<Tone> {
        let (frequency, duration) = match self {
            RawTone::Pair(frequency, duration) | RawTone::Object { frequency, duration } => {
                (frequency, duration)
            }
        };
        Tone::new(frequency.to_f64("frequency")?, duration.to_f64("duration")?)
    }
}

/// A number that may arrive as JSON text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn to_f64(&self, field: &str) -> PwmResult<f64> {
        match self {
            Numeric::Number(value) => Ok(*value),
            Numeric::Text(text) => text.trim().parse().map_err(|_| {
                PwmError::invalid_tune(format!("{} '{}' is not a number", field, text))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_pairs_normalizes_to_float() {
        let tune = Tune::from_pairs([(440_u32, 1_u32), (0, 2)]).unwrap();
        assert_eq!(
            tune.tones(),
            &[Tone::new(440.0, 1.0).unwrap(), Tone::rest(2.0).unwrap()]
        );
        assert_eq!(tune.total_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_tone_validation() {
        assert!(Tone::new(-1.0, 0.1).is_err());
        assert!(Tone::new(440.0, -0.1).is_err());
        assert!(Tone::new(f64::NAN, 0.1).is_err());
        assert!(Tone::new(440.0, f64::INFINITY).is_err());
        assert!(Tone::rest(0.5).unwrap().is_rest());
        assert!(!Tone::new(440.0, 0.5).unwrap().is_rest());
    }

    #[test]
    fn test_from_json_accepts_numeric_strings() {
        let tune = Tune::from_json(r#"[[440, 0.1], ["0", "0.1"], [" 523 ", 0.1]]"#).unwrap();
        let freqs: Vec<f64> = tune.iter().map(Tone::frequency_hz).collect();
        assert_eq!(freqs, vec![440.0, 0.0, 523.0]);
    }

    #[test]
    fn test_from_json_document_and_objects() {
        let json = r#"{"tones": [{"freq": 880, "duration": "0.25"}, {"frequency": 0, "duration": 0.5}]}"#;
        let tune: Tune = json.parse().unwrap();
        assert_eq!(tune.len(), 2);
        assert_eq!(tune.tones()[0].frequency_hz(), 880.0);
        assert_eq!(tune.total_duration(), Duration::from_millis(750));
    }

    #[test]
    fn test_from_json_errors() {
        let err = Tune::from_json("not json").unwrap_err();
        assert_eq!(err.code(), "PWM_006");

        let err = Tune::from_json(r#"[[440, 0.1], ["loud", 0.1]]"#).unwrap_err();
        assert!(err.to_string().contains("tone 1"));
        assert!(err.to_string().contains("loud"));

        let err = Tune::from_json(r#"[[440, -1]]"#).unwrap_err();
        assert_eq!(err.code(), "PWM_005");
    }

    #[test]
    fn test_from_pairs_accepts_wide_integers() {
        let tune = Tune::from_pairs([(440_u64, 1_usize), (523_u64, 2_usize)]).unwrap();
        assert_eq!(tune.tones()[1].frequency_hz(), 523.0);

        let tune = Tune::from_pairs([(880_i64, 0.5_f32)]).unwrap();
        assert_eq!(tune.total_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_unrepresentable_duration_rejected() {
        let err = Tune::from_pairs([(440.0, 1.0), (440.0, 1e30)]).unwrap_err();
        assert_eq!(err.code(), "PWM_005");

        let err = Tune::from_json(r#"[[440, 0.1], [440, 1e30]]"#).unwrap_err();
        assert!(err.to_string().contains("tone 1"));
    }

    #[test]
    fn test_total_duration_saturates() {
        let tune = Tune::from_pairs([(440.0, 1e19), (440.0, 1e19)]).unwrap();
        assert_eq!(tune.tones()[0].duration(), Duration::from_secs(10_000_000_000_000_000_000));
        assert_eq!(tune.total_duration(), Duration::MAX);
    }

    #[test]
    fn test_empty_tune() {
        let tune = Tune::from_json("[]").unwrap();
        assert!(tune.is_empty());
        assert_eq!(tune.total_duration(), Duration::ZERO);
    }
}
