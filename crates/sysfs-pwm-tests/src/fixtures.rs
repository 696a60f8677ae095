//! Fake sysfs controller trees backed by a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Attributes created inside each exported channel directory.
pub const CHANNEL_ATTRS: [&str; 3] = ["enable", "period", "duty_cycle"];

/// A temp directory laid out like `/sys/class/pwm/<name>`.
///
/// Unlike the kernel, writing to `export` does not create the channel
/// directory; tests call [`FakeController::export_channel`] for that.
pub struct FakeController {
    pub root: TempDir,
    pub name: String,
}

impl FakeController {
    /// Creates `pwmchip0` with empty `export`/`unexport` attributes.
    pub fn new() -> Self {
        Self::named("pwmchip0")
    }

    /// Creates a controller with the given directory name.
    pub fn named(name: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let chip = root.path().join(name);
        fs::create_dir_all(&chip).expect("Failed to create controller dir");
        for attr in ["export", "unexport"] {
            fs::write(chip.join(attr), "").expect("Failed to create controller attribute");
        }
        Self {
            root,
            name: name.to_string(),
        }
    }

    /// Directory to use as the registry's sysfs root.
    pub fn sysfs_root(&self) -> &Path {
        self.root.path()
    }

    /// Absolute controller directory.
    pub fn path(&self) -> PathBuf {
        self.root.path().join(&self.name)
    }

    /// Channel directory for `index`.
    pub fn channel_path(&self, index: u32) -> PathBuf {
        self.path().join(format!("pwm{}", index))
    }

    /// Creates the channel directory and its attributes, as the kernel
    /// does after an export.
    pub fn export_channel(&self, index: u32) -> PathBuf {
        let dir = self.channel_path(index);
        fs::create_dir_all(&dir).expect("Failed to create channel dir");
        for attr in CHANNEL_ATTRS {
            fs::write(dir.join(attr), "").expect("Failed to create channel attribute");
        }
        dir
    }

    /// Reads a controller-level attribute such as `export`.
    pub fn read_controller_attr(&self, attr: &str) -> String {
        fs::read_to_string(self.path().join(attr)).expect("Failed to read controller attribute")
    }

    /// Reads a channel attribute.
    pub fn read_attr(&self, index: u32, attr: &str) -> String {
        fs::read_to_string(self.channel_path(index).join(attr))
            .expect("Failed to read channel attribute")
    }
}

impl Default for FakeController {
    fn default() -> Self {
        Self::new()
    }
}
