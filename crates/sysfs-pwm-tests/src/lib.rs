//! sysfs-pwm End-to-End Test Infrastructure
//!
//! This crate exercises the library against fake controllers:
//!
//! - **Sysfs I/O**: real file writes into a tempdir laid out like
//!   `/sys/class/pwm`
//! - **Playback**: full tune scenarios, stop requests, callbacks
//! - **Ownership**: one handle per channel, serialized playback
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sysfs-pwm-tests
//!
//! # With library logging
//! RUST_LOG=sysfs_pwm=debug cargo test -p sysfs-pwm-tests -- --nocapture
//! ```

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::FakeController;
pub use harness::{init_tracing, memory_registry, GatedSleeper, SleepLog};
