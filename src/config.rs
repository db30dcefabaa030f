//! Device configuration and credential persistence.
//!
//! Platform-independent types: the stored WiFi credential, the wrapper that
//! persists it through a [`KvStore`], and the tuning constants the rest of
//! the firmware reads.

use crate::hal::KvStore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Baud rate the console opens with at boot.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Interval between status-indicator poll ticks, in milliseconds.
pub const STATUS_POLL_INTERVAL_MS: u64 = 10_000;

/// Maximum status polls during one connection attempt.
pub const CONNECT_MAX_ATTEMPTS: u32 = 20;

/// Delay between status polls during a connection attempt, in milliseconds.
pub const CONNECT_POLL_INTERVAL_MS: u64 = 500;

/// Fixed transmit power, in quarter-dBm units (8.5 dBm).
pub const TX_POWER_QUARTER_DBM: i8 = 34;

/// NVS namespace holding the credential.
pub const NVS_NAMESPACE: &str = "wifi";

/// Storage key for the network id.
pub const KEY_SSID: &str = "ssid";

/// Storage key for the secret.
pub const KEY_SECRET: &str = "secret";

/// A WiFi credential: network id plus optional secret.
///
/// An empty `ssid` means "no stored credential". The secret is zeroized
/// when the value is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    /// Network SSID.
    pub ssid: String,
    /// Secret; empty for open networks.
    pub secret: String,
}

impl Credential {
    pub fn new(ssid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            secret: secret.into(),
        }
    }

    /// Whether this credential targets an open network.
    pub fn is_open(&self) -> bool {
        self.secret.is_empty()
    }
}

/// Persists a single credential in the key-value store.
///
/// The credential is written on every connection attempt (before the result
/// is known) so the last-tried network survives a crash and is available for
/// auto-reconnect on the next boot.
pub struct CredentialStore<K> {
    kv: K,
}

impl<K: KvStore> CredentialStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Store `credential`, replacing whatever was there.
    pub fn save(&mut self, credential: &Credential) {
        self.kv.put_string(KEY_SSID, &credential.ssid);
        self.kv.put_string(KEY_SECRET, &credential.secret);
    }

    /// Load the stored credential; `None` when nothing is stored.
    pub fn load(&self) -> Option<Credential> {
        let ssid = self.kv.get_string(KEY_SSID, "");
        if ssid.is_empty() {
            return None;
        }
        let secret = self.kv.get_string(KEY_SECRET, "");
        Some(Credential { ssid, secret })
    }

    /// Wipe the stored credential.
    pub fn clear(&mut self) {
        self.kv.clear_all();
    }
}

/// Per-session device settings. Not persisted; lives for the process
/// lifetime and is mutated only by the "change baud rate" command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Current console baud rate.
    pub baud_rate: u32,
    /// Status poll interval in milliseconds. Fixed.
    pub poll_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: STATUS_POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MemStore;

    #[test]
    fn test_credential_roundtrip() {
        let mut store = CredentialStore::new(MemStore::default());
        let cred = Credential::new("Home", "hunter22");
        store.save(&cred);
        assert_eq!(store.load(), Some(cred));
    }

    #[test]
    fn test_open_network_roundtrip() {
        let mut store = CredentialStore::new(MemStore::default());
        store.save(&Credential::new("Cafe", ""));
        let loaded = store.load().unwrap();
        assert!(loaded.is_open());
        assert_eq!(loaded.ssid, "Cafe");
    }

    #[test]
    fn test_empty_store_loads_none() {
        let store = CredentialStore::new(MemStore::default());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_empty_ssid_means_no_credential() {
        let mut store = CredentialStore::new(MemStore::default());
        store.save(&Credential::new("", "leftover"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clear_forgets_credential() {
        let mut store = CredentialStore::new(MemStore::default());
        store.save(&Credential::new("Home", "hunter22"));
        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_overwrites_previous() {
        let mut store = CredentialStore::new(MemStore::default());
        store.save(&Credential::new("Home", "hunter22"));
        store.save(&Credential::new("Office", ""));
        assert_eq!(store.load(), Some(Credential::new("Office", "")));
    }

    #[test]
    fn test_default_device_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.poll_interval_ms, STATUS_POLL_INTERVAL_MS);
    }
}
