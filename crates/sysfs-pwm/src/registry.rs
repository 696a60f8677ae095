//! Channel registry.
//!
//! The registry guarantees one [`PwmChannel`] per physical channel: every
//! request for the same controller and index returns the same `Arc`, so all
//! callers share one lock and one stop flag.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::channel::{ChannelId, PwmChannel};
use crate::config::PwmConfig;
use crate::device::{PwmDevice, SysfsDevice};
use crate::error::PwmResult;
use crate::sleep::{Sleeper, ThreadSleeper};

/// Owns the channel handles for one device.
#[derive(Debug)]
pub struct ChannelRegistry {
    config: PwmConfig,
    device: Arc<dyn PwmDevice>,
    sleeper: Arc<dyn Sleeper>,
    channels: Mutex<HashMap<ChannelId, Arc<PwmChannel>>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    /// Creates a registry over the real sysfs tree with default config.
    pub fn new() -> Self {
        Self {
            config: PwmConfig::default(),
            device: Arc::new(SysfsDevice),
            sleeper: Arc::new(ThreadSleeper),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry whose sysfs root honors `PWM_SYSFS_ROOT`.
    pub fn from_env() -> Self {
        Self {
            config: PwmConfig::from_env(),
            ..Self::new()
        }
    }

    /// Creates a registry with the given config, rejecting invalid values.
    pub fn with_config(config: PwmConfig) -> PwmResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Replaces the device used by channels created from now on.
    pub fn with_device(mut self, device: Arc<dyn PwmDevice>) -> Self {
        self.device = device;
        self
    }

    /// Replaces the sleeper used by channels created from now on.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the registry config.
    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    /// Resolves a controller name to its directory.
    ///
    /// Absolute paths are used as given; anything else is looked up under
    /// the configured sysfs root.
    pub fn resolve_controller(&self, controller: impl AsRef<Path>) -> PathBuf {
        let controller = controller.as_ref();
        if controller.is_absolute() {
            controller.to_path_buf()
        } else {
            self.config.sysfs_root.join(controller)
        }
    }

    /// Returns the handle for `controller`/`index`, creating it on first use.
    pub fn channel(&self, controller: impl AsRef<Path>, index: u32) -> Arc<PwmChannel> {
        let id = ChannelId::new(self.resolve_controller(controller), index);
        let mut channels = self.channels.lock();
        channels
            .entry(id)
            .or_insert_with_key(|id| {
                debug!("creating handle for {}", id);
                Arc::new(PwmChannel::new(
                    id.clone(),
                    self.device.clone(),
                    self.sleeper.clone(),
                    self.config.default_duty_cycle,
                ))
            })
            .clone()
    }

    /// Number of handles created so far.
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    /// Returns true if no handle has been created.
    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }
}
