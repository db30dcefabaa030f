//! Scripted collaborator implementations for host-side tests.

use std::collections::{BTreeMap, VecDeque};

use super::{ConsolePort, KvStore, RadioControl, RadioError, RadioMode, Rgb, ScanEntry, StatusLed};

/// Radio whose link comes up a scripted number of status polls after
/// `connect`, or never.
#[derive(Default)]
pub struct MockRadio {
    pub scan_results: Vec<ScanEntry>,
    pub scan_error: Option<RadioError>,
    pub connect_error: Option<RadioError>,
    /// `Some(n)`: link is up on the n-th `is_connected` poll after a
    /// `connect` call (0 = immediately). `None`: never comes up.
    pub link_after_polls: Option<u32>,
    pub address: Option<String>,
    /// Every driver call, stringified in order.
    pub events: Vec<String>,
    connected: bool,
    countdown: Option<u32>,
}

impl MockRadio {
    pub fn with_networks(networks: &[(&str, i8)]) -> Self {
        Self {
            scan_results: networks
                .iter()
                .map(|(ssid, rssi)| ScanEntry {
                    ssid: (*ssid).to_string(),
                    rssi: *rssi,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Simulate the access point dropping the link.
    pub fn drop_link(&mut self) {
        self.connected = false;
        self.countdown = None;
    }

}

impl RadioControl for MockRadio {
    fn scan(&mut self) -> Result<Vec<ScanEntry>, RadioError> {
        self.events.push("scan".to_string());
        match &self.scan_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.scan_results.clone()),
        }
    }

    fn connect(&mut self, ssid: &str, secret: &str) -> Result<(), RadioError> {
        self.events.push(format!("connect {} {:?}", ssid, secret));
        self.connected = false;
        self.countdown = self.link_after_polls;
        match &self.connect_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn is_connected(&mut self) -> bool {
        if self.connected {
            return true;
        }
        if let Some(remaining) = self.countdown.as_mut() {
            if *remaining == 0 {
                self.connected = true;
                self.countdown = None;
            } else {
                *remaining -= 1;
            }
        }
        self.connected
    }

    fn local_address(&mut self) -> Option<String> {
        if self.connected {
            self.address.clone()
        } else {
            None
        }
    }

    fn disconnect(&mut self, clear_config: bool) -> Result<(), RadioError> {
        self.events.push(format!("disconnect clear={}", clear_config));
        self.connected = false;
        self.countdown = None;
        Ok(())
    }

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), RadioError> {
        self.events.push(format!("mode {}", mode));
        Ok(())
    }

    fn set_tx_power(&mut self, quarter_dbm: i8) -> Result<(), RadioError> {
        self.events.push(format!("txpower {}", quarter_dbm));
        Ok(())
    }
}

/// In-memory key-value store.
#[derive(Default)]
pub struct MemStore {
    pub map: BTreeMap<String, String>,
}

impl KvStore for MemStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        self.map.get(key).cloned().unwrap_or_else(|| default.to_string())
    }

    fn put_string(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    fn clear_all(&mut self) {
        self.map.clear();
    }
}

/// LED that records every color pushed to it.
#[derive(Default)]
pub struct RecordingLed {
    pub colors: Vec<Rgb>,
}

impl StatusLed for RecordingLed {
    fn set_all(&mut self, color: Rgb) {
        self.colors.push(color);
    }
}

/// Console port with scripted input lines and captured output.
#[derive(Default)]
pub struct ScriptedPort {
    /// Lines handed out by `read_line`, front first.
    pub lines: VecDeque<String>,
    /// Bytes handed out by `read_byte`, front first.
    pub bytes: VecDeque<u8>,
    pub output: String,
    pub baud_changes: Vec<u32>,
}

impl ScriptedPort {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn output_contains(&self, needle: &str) -> bool {
        self.output.contains(needle)
    }
}

impl ConsolePort for ScriptedPort {
    fn read_byte(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    fn read_line(&mut self) -> String {
        self.lines.pop_front().unwrap_or_default()
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn reopen(&mut self, baud_rate: u32) {
        self.baud_changes.push(baud_rate);
    }
}
