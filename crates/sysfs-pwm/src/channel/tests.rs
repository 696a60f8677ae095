//! Tests for channel writes, ordering and tone cleanup.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::device::{DeviceWrite, MemoryDevice};

const CHIP: &str = "/sys/class/pwm/pwmchip0";

fn attr(name: &str) -> PathBuf {
    Path::new(CHIP).join("pwm0").join(name)
}

fn channel_on(device: &Arc<MemoryDevice>) -> PwmChannel {
    PwmChannel::new(
        ChannelId::new(CHIP, 0),
        device.clone(),
        Arc::new(|_: Duration| {}),
        0.5,
    )
}

fn payloads(device: &MemoryDevice) -> Vec<(String, String)> {
    device
        .writes()
        .into_iter()
        .map(|w| (w.attr().to_string(), w.payload))
        .collect()
}

fn pair(attr: &str, payload: &str) -> (String, String) {
    (attr.to_string(), payload.to_string())
}

#[test]
fn test_channel_id_display_and_path() {
    let id = ChannelId::new(CHIP, 1);
    assert_eq!(id.to_string(), "<PWM @ /sys/class/pwm/pwmchip0/pwm1>");
    assert_eq!(id.path(), PathBuf::from("/sys/class/pwm/pwmchip0/pwm1"));
    assert_eq!(id.index(), 1);
}

#[test]
fn test_frequency_to_period() {
    assert_eq!(frequency_to_period_ns(440.0).unwrap() as u64, 2272727);
    assert_eq!(frequency_to_period_ns(1000.0).unwrap() as u64, 1000000);
    assert!(matches!(
        frequency_to_period_ns(0.0),
        Err(PwmError::InvalidFrequency { .. })
    ));
    assert!(frequency_to_period_ns(-440.0).is_err());
    assert!(frequency_to_period_ns(f64::NAN).is_err());
    assert!(frequency_to_period_ns(f64::INFINITY).is_err());
}

#[test]
fn test_set_duty_cycle_truncates() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    for fraction in [0.0, 0.125, 0.25, 0.5, 1.0] {
        channel.set_duty_cycle(1000, fraction).unwrap();
    }

    assert_eq!(
        payloads(&device),
        vec![
            pair("duty_cycle", "0"),
            pair("duty_cycle", "125"),
            pair("duty_cycle", "250"),
            pair("duty_cycle", "500"),
            pair("duty_cycle", "1000"),
        ]
    );
}

#[test]
fn test_set_duty_cycle_rejects_out_of_range() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    for fraction in [-0.1, 1.01, f64::NAN] {
        let err = channel.set_duty_cycle(1000, fraction).unwrap_err();
        assert!(matches!(err, PwmError::InvalidDutyCycle { .. }));
    }
    assert!(channel.set_period(1000, 2.0).is_err());
    assert!(device.writes().is_empty());
}

#[test]
fn test_set_frequency_write_order() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    channel.set_frequency(440.0, 0.5).unwrap();

    assert_eq!(
        device.writes(),
        vec![
            DeviceWrite::new(attr("duty_cycle"), "0"),
            DeviceWrite::new(attr("period"), "2272727"),
            DeviceWrite::new(attr("duty_cycle"), "1136363"),
        ]
    );
}

#[test]
fn test_set_period_ignores_rejected_reset() {
    let device = Arc::new(MemoryDevice::new());
    device.reject_payload(attr("duty_cycle"), "0", io::ErrorKind::InvalidInput);
    let channel = channel_on(&device);

    channel.set_period(1_000_000, 0.25).unwrap();

    assert_eq!(
        payloads(&device),
        vec![
            pair("duty_cycle", "0"),
            pair("period", "1000000"),
            pair("duty_cycle", "250000"),
        ]
    );
}

#[test]
fn test_set_period_surfaces_period_failure() {
    let device = Arc::new(MemoryDevice::new());
    device.reject_writes(attr("period"), io::ErrorKind::PermissionDenied);
    let channel = channel_on(&device);

    let err = channel.set_period(1_000_000, 0.5).unwrap_err();
    assert!(err.is_device());
    assert!(err.to_string().contains("period"));
    // The final duty cycle is never written against a period that failed.
    assert_eq!(
        payloads(&device),
        vec![pair("duty_cycle", "0"), pair("period", "1000000")]
    );
}

#[test]
fn test_set_frequency_zero_writes_nothing() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    assert!(matches!(
        channel.set_frequency(0.0, 0.5),
        Err(PwmError::InvalidFrequency { .. })
    ));
    assert!(channel.set_frequency(-1.0, 0.5).is_err());
    assert!(device.writes().is_empty());
}

#[test]
fn test_export_is_idempotent() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    assert!(!channel.is_exported());
    channel.export().unwrap();
    channel.export().unwrap();
    assert!(channel.is_exported());

    channel.unexport().unwrap();
    channel.unexport().unwrap();
    assert!(!channel.is_exported());

    assert_eq!(
        device.writes(),
        vec![
            DeviceWrite::new(Path::new(CHIP).join("export"), "0\n"),
            DeviceWrite::new(Path::new(CHIP).join("unexport"), "0\n"),
        ]
    );
}

#[test]
fn test_export_failure_is_surfaced() {
    let device = Arc::new(MemoryDevice::new());
    device.reject_writes(Path::new(CHIP).join("export"), io::ErrorKind::NotFound);
    let channel = channel_on(&device);

    let err = channel.export().unwrap_err();
    assert_eq!(err.code(), "PWM_004");
}

#[test]
fn test_enable_disable_always_write() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    channel.enable().unwrap();
    channel.disable().unwrap();
    channel.disable().unwrap();

    assert_eq!(
        payloads(&device),
        vec![
            pair("enable", "1\n"),
            pair("enable", "0\n"),
            pair("enable", "0\n"),
        ]
    );
}

#[test]
fn test_play_rest_touches_nothing() {
    let device = Arc::new(MemoryDevice::new());
    let slept = Arc::new(Mutex::new(Vec::new()));
    let slept_in = slept.clone();
    let channel = PwmChannel::new(
        ChannelId::new(CHIP, 0),
        device.clone(),
        Arc::new(move |d: Duration| slept_in.lock().push(d)),
        0.5,
    );

    channel.play_tone(0.0, 0.25).unwrap();

    assert!(device.writes().is_empty());
    assert_eq!(*slept.lock(), vec![Duration::from_millis(250)]);
}

#[test]
fn test_play_rest_blocks_for_duration() {
    let device = Arc::new(MemoryDevice::new());
    let channel = PwmChannel::new(
        ChannelId::new(CHIP, 0),
        device.clone(),
        Arc::new(crate::sleep::ThreadSleeper),
        0.5,
    );

    let start = Instant::now();
    channel.play_tone(0.0, 0.05).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(device.writes().is_empty());
}

#[test]
fn test_play_tone_enables_around_sleep() {
    let device = Arc::new(MemoryDevice::new());
    let writes_at_sleep = Arc::new(Mutex::new(Vec::new()));
    let (device_in, marks) = (device.clone(), writes_at_sleep.clone());
    let channel = PwmChannel::new(
        ChannelId::new(CHIP, 0),
        device.clone(),
        Arc::new(move |_: Duration| marks.lock().push(device_in.writes().len())),
        0.5,
    );

    channel.play_tone(1000.0, 0.1).unwrap();

    assert_eq!(
        payloads(&device),
        vec![
            pair("duty_cycle", "0"),
            pair("period", "1000000"),
            pair("duty_cycle", "500000"),
            pair("enable", "1\n"),
            pair("enable", "0\n"),
        ]
    );
    // Sleep happened after the enable write and before the disable.
    assert_eq!(*writes_at_sleep.lock(), vec![4]);
}

#[test]
fn test_play_tone_disables_once_when_sleep_panics() {
    let device = Arc::new(MemoryDevice::new());
    let channel = PwmChannel::new(
        ChannelId::new(CHIP, 0),
        device.clone(),
        Arc::new(|_: Duration| panic!("sleep interrupted")),
        0.5,
    );

    let result = catch_unwind(AssertUnwindSafe(|| channel.play_tone(440.0, 0.1)));
    assert!(result.is_err());

    let writes = payloads(&device);
    let disables = writes
        .iter()
        .filter(|w| **w == pair("enable", "0\n"))
        .count();
    assert_eq!(disables, 1);
    assert_eq!(writes.last(), Some(&pair("enable", "0\n")));
}

#[test]
fn test_play_tone_disables_when_enable_fails() {
    let device = Arc::new(MemoryDevice::new());
    device.reject_payload(attr("enable"), "1\n", io::ErrorKind::PermissionDenied);
    let channel = channel_on(&device);

    let err = channel.play_tone(440.0, 0.1).unwrap_err();
    assert!(err.to_string().contains("enable"));
    assert_eq!(payloads(&device).last(), Some(&pair("enable", "0\n")));
}

#[test]
fn test_play_tone_rejects_bad_duration() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    assert!(matches!(
        channel.play_tone(440.0, -1.0),
        Err(PwmError::InvalidDuration { .. })
    ));
    assert!(channel.play_tone(440.0, f64::NAN).is_err());
    assert!(device.writes().is_empty());
}

#[test]
fn test_stop_flag() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    assert!(!channel.stop_requested());
    channel.request_stop();
    assert!(channel.stop_requested());
    channel.clear_stop();
    assert!(!channel.stop_requested());
    assert!(!channel.is_playing());
}

#[test]
fn test_guard_runs_sibling_operations_without_relocking() {
    let device = Arc::new(MemoryDevice::new());
    let channel = channel_on(&device);

    let guard = channel.lock();
    guard.set_frequency(1000.0, 0.5).unwrap();
    guard.enable().unwrap();
    guard.disable().unwrap();
    assert_eq!(guard.id().index(), 0);
    drop(guard);

    assert_eq!(device.writes().len(), 5);
}
