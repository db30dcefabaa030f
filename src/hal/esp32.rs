//! ESP-IDF implementations of the HAL traits.
//!
//! Everything here wraps an ESP-IDF driver and converts its errors into the
//! platform-independent types from [`crate::hal`]. Core code never sees
//! `EspError`.

use log::{debug, warn};

use esp_idf_hal::delay::{FreeRtos, NON_BLOCK};
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::RmtChannel;
use esp_idf_hal::uart::UartDriver;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};
use esp_idf_sys::EspError;
use ws2812_esp32_rmt_driver::{Ws2812Esp32RmtDriver, Ws2812Esp32RmtDriverError};

use super::{ConsolePort, KvStore, RadioControl, RadioError, RadioMode, Rgb, ScanEntry, StatusLed};
use crate::config::{KEY_SECRET, KEY_SSID};

/// Largest value the credential store reads back.
const MAX_VALUE_LEN: usize = 128;

/// WiFi driver wrapper.
///
/// `connect` only kicks off association; the supervisor polls
/// [`RadioControl::is_connected`] for the result.
pub struct EspRadio<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> EspRadio<'a> {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, EspError> {
        let mut wifi = EspWifi::new(modem, sysloop, None)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;
        Ok(Self { wifi })
    }

    fn driver_err(e: EspError) -> RadioError {
        RadioError::Driver(format!("{:?}", e))
    }
}

impl RadioControl for EspRadio<'_> {
    fn scan(&mut self) -> Result<Vec<ScanEntry>, RadioError> {
        let found = self.wifi.scan().map_err(Self::driver_err)?;
        Ok(found
            .into_iter()
            .map(|ap| ScanEntry {
                ssid: ap.ssid.as_str().to_string(),
                rssi: ap.signal_strength,
            })
            .collect())
    }

    fn connect(&mut self, ssid: &str, secret: &str) -> Result<(), RadioError> {
        let auth_method = if secret.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| RadioError::InvalidSsid)?,
            password: secret.try_into().map_err(|_| RadioError::InvalidSecret)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(Self::driver_err)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(Self::driver_err)?;
        }
        self.wifi.connect().map_err(Self::driver_err)
    }

    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn local_address(&mut self) -> Option<String> {
        if !self.is_connected() {
            return None;
        }
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.to_string())
    }

    fn disconnect(&mut self, clear_config: bool) -> Result<(), RadioError> {
        if let Err(e) = self.wifi.disconnect() {
            // Not associated; the teardown below still applies.
            debug!("wifi disconnect: {:?}", e);
        }
        if clear_config {
            self.wifi.stop().map_err(Self::driver_err)?;
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration::default()))
                .map_err(Self::driver_err)?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), RadioError> {
        let config = match mode {
            RadioMode::Station => Configuration::Client(ClientConfiguration::default()),
            RadioMode::AccessPoint => {
                Configuration::AccessPoint(AccessPointConfiguration::default())
            }
            RadioMode::StationAccessPoint => Configuration::Mixed(
                ClientConfiguration::default(),
                AccessPointConfiguration::default(),
            ),
            RadioMode::Off => return self.wifi.stop().map_err(Self::driver_err),
        };
        self.wifi.set_configuration(&config).map_err(Self::driver_err)?;
        self.wifi.start().map_err(Self::driver_err)
    }

    fn set_tx_power(&mut self, quarter_dbm: i8) -> Result<(), RadioError> {
        esp_idf_sys::esp!(unsafe { esp_idf_sys::esp_wifi_set_max_tx_power(quarter_dbm) })
            .map_err(Self::driver_err)
    }
}

/// WS2812 status pixel on an RMT channel.
pub struct NeoPixel<'a> {
    driver: Ws2812Esp32RmtDriver<'a>,
    pixel_count: usize,
    brightness: u8,
}

impl<'a> NeoPixel<'a> {
    pub fn new(
        channel: impl Peripheral<P = impl RmtChannel> + 'a,
        pin: impl Peripheral<P = impl OutputPin> + 'a,
        pixel_count: usize,
        brightness: u8,
    ) -> Result<Self, Ws2812Esp32RmtDriverError> {
        Ok(Self {
            driver: Ws2812Esp32RmtDriver::new(channel, pin)?,
            pixel_count,
            brightness,
        })
    }

    fn scale(&self, channel: u8) -> u8 {
        ((channel as u16 * (self.brightness as u16 + 1)) >> 8) as u8
    }
}

impl StatusLed for NeoPixel<'_> {
    fn set_all(&mut self, color: Rgb) {
        // WS2812 takes GRB order.
        let pixel = [self.scale(color.g), self.scale(color.r), self.scale(color.b)];
        let sequence: Vec<u8> = std::iter::repeat(pixel)
            .take(self.pixel_count)
            .flatten()
            .collect();
        if let Err(e) = self.driver.write_blocking(sequence.into_iter()) {
            warn!("status pixel write failed: {:?}", e);
        }
    }
}

/// Credential storage in an NVS namespace.
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    pub fn open(namespace: &str) -> Result<Self, EspError> {
        let partition = EspNvsPartition::<NvsDefault>::take()?;
        Ok(Self {
            nvs: EspNvs::new(partition, namespace, true)?,
        })
    }
}

impl KvStore for NvsStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        let mut buf = [0u8; MAX_VALUE_LEN];
        match self.nvs.get_str(key, &mut buf) {
            Ok(Some(value)) => value.to_string(),
            Ok(None) => default.to_string(),
            Err(e) => {
                warn!("nvs read of {} failed: {:?}", key, e);
                default.to_string()
            }
        }
    }

    fn put_string(&mut self, key: &str, value: &str) {
        if let Err(e) = self.nvs.set_str(key, value) {
            warn!("nvs write of {} failed: {:?}", key, e);
        }
    }

    fn clear_all(&mut self) {
        // NVS has no namespace-wide erase through this API; the store only
        // ever holds the credential keys.
        for key in [KEY_SSID, KEY_SECRET] {
            if let Err(e) = self.nvs.remove(key) {
                warn!("nvs remove of {} failed: {:?}", key, e);
            }
        }
    }
}

/// Operator console over a UART.
pub struct UartConsole<'a> {
    uart: UartDriver<'a>,
}

impl<'a> UartConsole<'a> {
    pub fn new(uart: UartDriver<'a>) -> Self {
        Self { uart }
    }
}

impl ConsolePort for UartConsole<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        loop {
            match self.read_byte() {
                Some(b'\n') => break,
                Some(b'\r') => {}
                Some(byte) => line.push(byte as char),
                None => FreeRtos::delay_ms(10),
            }
        }
        line
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.uart.write(text.as_bytes()) {
            warn!("uart write failed: {:?}", e);
        }
    }

    fn reopen(&mut self, baud_rate: u32) {
        if let Err(e) = self.uart.change_baudrate(Hertz(baud_rate)) {
            warn!("baud rate change to {} failed: {:?}", baud_rate, e);
        }
    }
}
