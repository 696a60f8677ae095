//! Scoped enable/disable of channel output.

use tracing::warn;

use super::ChannelGuard;
use crate::error::PwmResult;

/// Output that is switched off when this value goes away.
///
/// [`EnabledOutput::disable`] is the normal exit and reports the device
/// error. If the value is dropped instead (a failed enable, or a panic
/// while the tone sleeps), `Drop` disables and logs any failure.
pub(super) struct EnabledOutput<'g, 'a> {
    guard: &'g ChannelGuard<'a>,
    armed: bool,
}

impl<'g, 'a> EnabledOutput<'g, 'a> {
    pub(super) fn enable(guard: &'g ChannelGuard<'a>) -> PwmResult<Self> {
        let output = Self { guard, armed: true };
        guard.enable()?;
        Ok(output)
    }

    pub(super) fn disable(mut self) -> PwmResult<()> {
        self.armed = false;
        self.guard.disable()
    }
}

impl Drop for EnabledOutput<'_, '_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.guard.disable() {
            warn!("failed to disable {}: {}", self.guard.id(), err);
        }
    }
}
