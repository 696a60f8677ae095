//! Device interface for PWM control attributes.
//!
//! The kernel exposes each PWM controller as a directory of writable text
//! attributes. [`PwmDevice`] is the seam between channel logic and that
//! filesystem: [`SysfsDevice`] talks to the real thing, [`MemoryDevice`]
//! simulates it in memory and records every write.

use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::trace;

/// Access to PWM control attributes.
pub trait PwmDevice: Send + Sync + fmt::Debug {
    /// Writes `payload` to the attribute at `path`.
    fn write_attr(&self, path: &Path, payload: &[u8]) -> io::Result<()>;

    /// Returns true if `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Device backed by the real sysfs filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsDevice;

impl PwmDevice for SysfsDevice {
    fn write_attr(&self, path: &Path, payload: &[u8]) -> io::Result<()> {
        trace!(path = %path.display(), payload = %String::from_utf8_lossy(payload).trim_end(), "write");
        // Attributes are never created; a missing file means the channel or
        // controller is absent.
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
        file.write_all(payload)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// A single attribute write observed by [`MemoryDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceWrite {
    /// Attribute path.
    pub path: PathBuf,
    /// Payload as text.
    pub payload: String,
}

impl DeviceWrite {
    /// Creates a write record.
    pub fn new(path: impl Into<PathBuf>, payload: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            payload: payload.into(),
        }
    }

    /// Returns the attribute name (last path component).
    pub fn attr(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct Rejection {
    path: PathBuf,
    payload: Option<String>,
    kind: io::ErrorKind,
}

impl Rejection {
    fn matches(&self, path: &Path, payload: &str) -> bool {
        self.path == path && self.payload.as_deref().map_or(true, |p| p == payload)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    writes: Vec<DeviceWrite>,
    exported: HashSet<PathBuf>,
    rejections: Vec<Rejection>,
}

/// In-memory device that simulates export/unexport and logs every write.
///
/// Every attempted write is recorded, including ones rejected through
/// [`MemoryDevice::reject_writes`] or [`MemoryDevice::reject_payload`].
/// Writing `N\n` to a controller's `export` attribute makes `pwmN` appear;
/// `unexport` removes it.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    state: Mutex<MemoryState>,
}

impl MemoryDevice {
    /// Creates an empty device with no exported channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a channel directory as already exported.
    pub fn with_exported(self, channel_dir: impl Into<PathBuf>) -> Self {
        self.state.lock().exported.insert(channel_dir.into());
        self
    }

    /// Fails every write to `path` with `kind`.
    pub fn reject_writes(&self, path: impl Into<PathBuf>, kind: io::ErrorKind) {
        self.state.lock().rejections.push(Rejection {
            path: path.into(),
            payload: None,
            kind,
        });
    }

    /// Fails writes of exactly `payload` to `path` with `kind`.
    pub fn reject_payload(
        &self,
        path: impl Into<PathBuf>,
        payload: impl Into<String>,
        kind: io::ErrorKind,
    ) {
        self.state.lock().rejections.push(Rejection {
            path: path.into(),
            payload: Some(payload.into()),
            kind,
        });
    }

    /// Returns a snapshot of the write log.
    pub fn writes(&self) -> Vec<DeviceWrite> {
        self.state.lock().writes.clone()
    }

    /// Clears the write log, keeping exported channels and rejections.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl PwmDevice for MemoryDevice {
    fn write_attr(&self, path: &Path, payload: &[u8]) -> io::Result<()> {
        let payload = String::from_utf8_lossy(payload).into_owned();
        let mut state = self.state.lock();
        state.writes.push(DeviceWrite::new(path, payload.clone()));

        if let Some(rejection) = state.rejections.iter().find(|r| r.matches(path, &payload)) {
            return Err(io::Error::from(rejection.kind));
        }

        let attr = path.file_name().and_then(|name| name.to_str());
        if let (Some(attr @ ("export" | "unexport")), Some(controller)) = (attr, path.parent()) {
            let index: u32 = payload
                .trim()
                .parse()
                .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
            let channel_dir = controller.join(format!("pwm{}", index));
            if attr == "export" {
                state.exported.insert(channel_dir);
            } else {
                state.exported.remove(&channel_dir);
            }
        }

        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.lock().exported.contains(path)
    }
}
