//! WiFi connectivity manager with an operator console.
//!
//! Two cooperating state machines drive a small ESP32 device: a
//! [`supervisor::ConnectionSupervisor`] that decides when to attempt, retry,
//! and persist a WiFi connection, and a [`console::ConsoleSession`] that
//! interprets line-oriented operator commands against a single-level menu.
//! A [`poll::PollLoop`] ties the supervisor to the status pixel on a fixed
//! interval.
//!
//! The core is platform-independent and tests on the host machine without
//! ESP32 hardware; the ESP-IDF bindings live in [`hal::esp32`] behind the
//! `esp32` feature.

pub mod config;
pub mod console;
pub mod hal;
pub mod indicator;
pub mod poll;
pub mod supervisor;

// Re-export commonly used items
pub use config::{Credential, DeviceConfig};
pub use console::ConsoleSession;
pub use indicator::StatusIndicator;
pub use poll::PollLoop;
pub use supervisor::{
    BootReconnect, ConnectError, ConnectionState, ConnectionSupervisor, RetryPolicy,
};
