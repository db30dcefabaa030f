//! Hardware abstraction layer.
//!
//! The core state machines never touch ESP-IDF directly; they consume the
//! narrow traits defined here. This keeps the connection and console logic
//! testable on the host machine without ESP32 hardware.
//!
//! # Components
//!
//! - [`RadioControl`] - WiFi driver operations (scan, associate, status)
//! - [`StatusLed`] - addressable status pixel
//! - [`KvStore`] - persistent key-value storage for credentials
//! - [`ConsolePort`] - character-stream transport for the operator console
//!
//! ESP32 implementations live in [`esp32`] (feature-gated).

use std::fmt;

#[cfg(feature = "esp32")]
pub mod esp32;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "esp32")]
pub use esp32::{EspRadio, NeoPixel, NvsStore, UartConsole};

/// One network found by a scan, in driver-reported order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Network SSID.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i8,
}

/// Radio operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    /// Station (client) mode.
    Station,
    /// Access point mode.
    AccessPoint,
    /// Station and access point simultaneously.
    StationAccessPoint,
    /// Radio disabled.
    Off,
}

impl RadioMode {
    /// Short name as shown to the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Station => "STA",
            Self::AccessPoint => "AP",
            Self::StationAccessPoint => "APSTA",
            Self::Off => "NULL",
        }
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from the radio driver boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// SSID rejected by the driver (too long or malformed).
    InvalidSsid,
    /// Secret rejected by the driver.
    InvalidSecret,
    /// Underlying driver failure, already stringified at the boundary.
    Driver(String),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidSecret => write!(f, "invalid secret"),
            Self::Driver(msg) => write!(f, "radio driver error: {}", msg),
        }
    }
}

impl std::error::Error for RadioError {}

/// Radio driver operations.
///
/// `connect` is fire-and-forget; completion is observed by polling
/// [`RadioControl::is_connected`].
pub trait RadioControl {
    /// Scan for nearby networks.
    fn scan(&mut self) -> Result<Vec<ScanEntry>, RadioError>;

    /// Begin associating with `ssid`. An empty `secret` means an open network.
    fn connect(&mut self, ssid: &str, secret: &str) -> Result<(), RadioError>;

    /// Whether the link is currently up.
    fn is_connected(&mut self) -> bool;

    /// Assigned local address, if connected.
    fn local_address(&mut self) -> Option<String>;

    /// Tear down the current association. With `clear_config` the driver
    /// also forgets its own stored configuration.
    fn disconnect(&mut self, clear_config: bool) -> Result<(), RadioError>;

    /// Switch the radio operating mode.
    fn set_mode(&mut self, mode: RadioMode) -> Result<(), RadioError>;

    /// Set the transmit power in quarter-dBm units.
    fn set_tx_power(&mut self, quarter_dbm: i8) -> Result<(), RadioError>;
}

/// An RGB color for the status pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Addressable-LED peripheral. Failures are not observable; implementations
/// log and swallow driver errors.
pub trait StatusLed {
    /// Set every pixel to `color` and push to hardware.
    fn set_all(&mut self, color: Rgb);
}

/// Persistent key-value storage, string values only.
///
/// Write failures are not surfaced; implementations log them.
pub trait KvStore {
    /// Read `key`, returning `default` when absent.
    fn get_string(&self, key: &str, default: &str) -> String;

    /// Write `key` = `value`.
    fn put_string(&mut self, key: &str, value: &str);

    /// Remove everything this store holds.
    fn clear_all(&mut self);
}

/// Character-stream transport used for operator I/O.
pub trait ConsolePort {
    /// Non-blocking read of one byte; `None` when nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Blocking read of one full line. The trailing delimiter (and any `\r`)
    /// is stripped.
    fn read_line(&mut self) -> String;

    /// Write text to the operator.
    fn write(&mut self, text: &str);

    /// Reopen the transport at a new baud rate.
    fn reopen(&mut self, baud_rate: u32);

    /// Discard any residual buffered input. Called around every blocking
    /// read to prevent cross-talk between prompts.
    fn drain(&mut self) {
        while self.read_byte().is_some() {}
    }

    /// Write `text` followed by a line terminator.
    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }
}
