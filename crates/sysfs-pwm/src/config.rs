//! Registry configuration.

use std::path::PathBuf;

use crate::error::{PwmError, PwmResult};

/// Default root under which bare controller names are resolved.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/pwm";

/// Default duty cycle fraction used when playing tones.
pub const DEFAULT_DUTY_CYCLE: f64 = 0.5;

/// Environment variable overriding [`PwmConfig::sysfs_root`].
pub const SYSFS_ROOT_ENV: &str = "PWM_SYSFS_ROOT";

/// Configuration shared by every channel of a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct PwmConfig {
    /// Root directory for bare controller names such as `pwmchip0`.
    pub sysfs_root: PathBuf,
    /// Duty cycle fraction used by `play_tone`.
    pub default_duty_cycle: f64,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            default_duty_cycle: DEFAULT_DUTY_CYCLE,
        }
    }
}

impl PwmConfig {
    /// Creates the default config, honoring `PWM_SYSFS_ROOT` if set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(SYSFS_ROOT_ENV) {
            Some(root) if !root.is_empty() => config.sysfs_root(root),
            _ => config,
        }
    }

    /// Sets the controller root directory.
    pub fn sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Sets the default duty cycle fraction.
    pub fn default_duty_cycle(mut self, duty_cycle: f64) -> Self {
        self.default_duty_cycle = duty_cycle;
        self
    }

    /// Checks that all values are in range.
    pub fn validate(&self) -> PwmResult<()> {
        if !(0.0..=1.0).contains(&self.default_duty_cycle) {
            return Err(PwmError::invalid_config(format!(
                "default_duty_cycle {} is outside [0, 1]",
                self.default_duty_cycle
            )));
        }
        Ok(())
    }
}
