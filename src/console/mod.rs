//! Operator console.
//!
//! [`ConsoleSession`] interprets complete input lines from the operator:
//! top-level `/`-commands are always recognized, numeric menu selections
//! only while the menu is open. Menu actions call into the
//! [`ConnectionSupervisor`] and print human-readable results back to the
//! console port; nothing here is fatal, every path returns to the prompt.
//!
//! Sub-prompts (network selection, password entry, baud rate) block on
//! [`ConsolePort::read_line`] and drain residual input around each read so
//! consecutive prompts do not see each other's leftovers.

mod command;

pub use command::{parse_choice, Command, COMMAND_SENTINEL, HELP_TEXT, MENU_TEXT, MODE_MENU_TEXT};

use log::warn;

use crate::config::{Credential, DeviceConfig};
use crate::hal::{ConsolePort, KvStore, RadioControl, RadioMode, ScanEntry};
use crate::supervisor::{BootReconnect, ConnectError, ConnectionSupervisor};

/// Menu state plus the console transport.
pub struct ConsoleSession<P> {
    port: P,
    in_menu: bool,
    config: DeviceConfig,
    line_buf: String,
}

impl<P: ConsolePort> ConsoleSession<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            in_menu: false,
            config: DeviceConfig::default(),
            line_buf: String::new(),
        }
    }

    /// Whether the menu is open. The poll loop reads this to suppress the
    /// red indicator during an active session.
    pub fn in_menu(&self) -> bool {
        self.in_menu
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Pull available bytes off the port and return a line once the
    /// delimiter arrives. Never blocks; call from the outer loop.
    pub fn poll_line(&mut self) -> Option<String> {
        while let Some(byte) = self.port.read_byte() {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.line_buf);
                if line.ends_with('\r') {
                    line.pop();
                }
                return Some(line);
            }
            self.line_buf.push(byte as char);
        }
        None
    }

    /// Boot-time reconnect with operator feedback.
    pub fn auto_reconnect<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        if let Some(credential) = supervisor.stored_credential() {
            self.port
                .write_line(&format!("\nAuto Connecting to {}", credential.ssid));
        }
        let port = &mut self.port;
        match supervisor.auto_reconnect_on_boot(|| port.write(".")) {
            BootReconnect::NoCredential => {
                self.port.write_line("No stored WiFi credentials found.");
            }
            BootReconnect::Connected { ssid, .. } => {
                self.port.write("\n");
                self.port.write_line(&format!("WiFi Connected To: {}\n", ssid));
            }
            BootReconnect::Failed { ssid, .. } => {
                self.port.write("\n");
                self.port
                    .write_line(&format!("Failed To Connect To: {}\n", ssid));
            }
        }
    }

    /// Interpret one complete input line.
    pub fn handle_line<R: RadioControl, K: KvStore>(
        &mut self,
        line: &str,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        match Command::parse(line) {
            Some(Command::OpenMenu) => {
                self.in_menu = true;
                self.port.write(MENU_TEXT);
            }
            Some(Command::ExitMenu) => {
                self.in_menu = false;
                self.port.write_line("\nExiting WiFi Manager...");
            }
            Some(Command::Back) => self.port.write(MENU_TEXT),
            Some(Command::Help) => self.port.write(HELP_TEXT),
            None if self.in_menu => self.process_menu(line, supervisor),
            // Outside the menu, anything else is silently ignored.
            None => {}
        }
    }

    fn process_menu<R: RadioControl, K: KvStore>(
        &mut self,
        line: &str,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        match parse_choice(line) {
            Some(1) => self.connect_flow(supervisor),
            Some(2) => {
                let _ = self.scan_flow(supervisor);
            }
            Some(3) => self.show_info(supervisor),
            Some(4) => {
                supervisor.disconnect();
                self.port.write_line("\nDisconnected from WiFi.");
            }
            Some(5) => self.change_mode_flow(supervisor),
            Some(6) => match supervisor.radio_off() {
                Ok(()) => self.port.write_line("\nWiFi turned off."),
                Err(e) => self.port.write_line(&format!("\nFailed to turn off WiFi: {}", e)),
            },
            Some(7) => match supervisor.radio_on() {
                Ok(()) => self.port.write_line("\nWiFi turned on."),
                Err(e) => self.port.write_line(&format!("\nFailed to turn on WiFi: {}", e)),
            },
            Some(8) => {
                supervisor.clear_credentials();
                self.port.write_line(
                    "\nWiFi preferences cleared. Device will no longer auto-reconnect.",
                );
            }
            Some(9) => self.change_baud_flow(),
            _ => self.port.write_line("\nInvalid choice. Please try again."),
        }
    }

    /// Scan, print the numbered listing, and hand back the results for the
    /// selection prompt. `None` when the driver errored.
    fn scan_flow<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) -> Option<Vec<ScanEntry>> {
        self.port.write_line("\nScanning for networks...");
        let networks = match supervisor.scan() {
            Ok(networks) => networks,
            Err(e) => {
                self.port.write_line(&format!("Scan failed: {}", e));
                return None;
            }
        };
        self.port.write_line("Scan complete.");
        if networks.is_empty() {
            self.port.write_line("No networks found.");
        } else {
            self.port
                .write_line(&format!("{} networks found:", networks.len()));
            for (i, entry) in networks.iter().enumerate() {
                self.port
                    .write_line(&format!("{}: {} ({})", i + 1, entry.ssid, entry.rssi));
            }
        }
        Some(networks)
    }

    fn connect_flow<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        let Some(networks) = self.scan_flow(supervisor) else {
            return;
        };
        if networks.is_empty() {
            return;
        }

        self.port
            .write("\nEnter the number of the network you want to connect to: ");
        self.port.drain();
        let line = self.port.read_line();
        self.port.drain();

        let index = match parse_choice(&line) {
            Some(n) if n >= 1 && (n as usize) <= networks.len() => n as usize,
            _ => {
                self.port.write_line("Invalid choice. Please try again.");
                return;
            }
        };
        let ssid = networks[index - 1].ssid.clone();

        self.port.write_line("\n==================");
        self.port.write_line(&format!("\nSelected network: {}", ssid));

        self.port.write_line("Does the network have a password? (y/n): ");
        let answer = self.port.read_line();
        self.port.drain();

        let mut secret = String::new();
        if answer.trim_start().starts_with(['y', 'Y']) {
            self.port.write("Enter password: ");
            secret = self.port.read_line().trim().to_string();
            self.port.drain();
        }

        let credential = Credential::new(ssid, secret);
        self.run_attempt(supervisor, &credential, false);
    }

    fn run_attempt<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
        credential: &Credential,
        is_auto_reconnect: bool,
    ) {
        let verb = if is_auto_reconnect {
            "Auto Connecting"
        } else {
            "Connecting"
        };
        self.port
            .write_line(&format!("\n{} to {}", verb, credential.ssid));

        let port = &mut self.port;
        let result = supervisor.attempt(credential, is_auto_reconnect, || port.write("."));
        self.port.write("\n");

        match result {
            Ok(_) => self
                .port
                .write_line(&format!("WiFi Connected To: {}\n", credential.ssid)),
            Err(ConnectError::Timeout { .. }) => self
                .port
                .write_line(&format!("Failed To Connect To: {}\n", credential.ssid)),
            Err(e) => self.port.write_line(&format!("Connection error: {}", e)),
        }
    }

    fn show_info<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        let (ssid, address) = supervisor.info();
        self.port.write_line("\nWiFi/ESP32 info:");
        self.port
            .write_line(&format!("SSID: {}", ssid.unwrap_or_default()));
        self.port.write_line(&format!(
            "IP Address: {}",
            address.as_deref().unwrap_or("0.0.0.0")
        ));
    }

    fn change_mode_flow<R: RadioControl, K: KvStore>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
    ) {
        self.port.write(MODE_MENU_TEXT);
        self.port.drain();
        let line = self.port.read_line();
        self.port.drain();

        // An invalid sub-choice falls through with no message; legacy menu
        // behavior, kept as-is.
        let mode = match parse_choice(&line) {
            Some(1) => RadioMode::Station,
            Some(2) => RadioMode::AccessPoint,
            Some(3) => RadioMode::StationAccessPoint,
            _ => return,
        };
        match supervisor.set_mode(mode) {
            Ok(()) => self
                .port
                .write_line(&format!("WiFi mode set to {}", mode.as_str())),
            Err(e) => warn!("mode change to {} failed: {}", mode, e),
        }
    }

    fn change_baud_flow(&mut self) {
        self.port
            .write_line("\nEnter new baud rate (e.g., 9600, 19200, 115200): ");
        self.port.drain();
        let line = self.port.read_line();
        self.port.drain();

        match parse_choice(&line) {
            Some(rate) if rate > 0 && rate <= u32::MAX as i64 => {
                self.config.baud_rate = rate as u32;
                self.port.reopen(rate as u32);
                self.port
                    .write_line(&format!("\nBaud rate changed to: {}", rate));
            }
            _ => self.port.write_line("\nInvalid baud rate. Please try again."),
        }
    }
}
