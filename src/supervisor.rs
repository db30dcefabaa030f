//! Connection supervision.
//!
//! [`ConnectionSupervisor`] owns the connection state machine: when to
//! attempt a connection, how long to wait for the link, what to persist,
//! and how a dropped link is noticed. It is the single writer of
//! [`ConnectionState`]; the poll loop and the console only read it.
//!
//! # State machine
//!
//! ```text
//! Disconnected --attempt--> Connecting --link up--> Connected
//!                               |                       |
//!                               +--retries exhausted--> Failed
//! Connected --drop noticed on poll--> Disconnected
//! Failed/Connected --attempt(new credential)--> Connecting
//! ```

use std::fmt;
use std::time::Duration;

use log::{info, warn};

use crate::config::{
    Credential, CredentialStore, CONNECT_MAX_ATTEMPTS, CONNECT_POLL_INTERVAL_MS,
    TX_POWER_QUARTER_DBM,
};
use crate::hal::{KvStore, RadioControl, RadioError, RadioMode, ScanEntry};

/// Connectivity state as last observed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link and no attempt in progress.
    Disconnected,
    /// An attempt is waiting for the link to come up.
    Connecting,
    /// Link is up.
    Connected,
    /// The last attempt exhausted its retry budget.
    Failed,
}

impl ConnectionState {
    /// Whether this state maps to the red indicator.
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

/// Bounded-retry parameters for one connection attempt.
///
/// The budget is counted in poll iterations, not wall-clock deadlines.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum status polls before the attempt is declared failed.
    pub max_attempts: u32,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: CONNECT_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(CONNECT_POLL_INTERVAL_MS),
        }
    }
}

/// Why a connection attempt did not end in `Connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The retry budget ran out before the link came up.
    Timeout {
        /// Polls performed before giving up.
        attempts: u32,
    },
    /// The driver rejected the attempt outright.
    Radio(RadioError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { attempts } => {
                write!(f, "connection timed out after {} attempts", attempts)
            }
            Self::Radio(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConnectError {}

impl From<RadioError> for ConnectError {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

/// Outcome of the boot-time auto-reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootReconnect {
    /// Nothing stored; no attempt was made.
    NoCredential,
    /// Reconnected to the stored network.
    Connected {
        ssid: String,
        address: Option<String>,
    },
    /// The stored network did not answer within the retry budget.
    Failed { ssid: String, error: ConnectError },
}

/// Owns the radio, the credential store, and the connection state machine.
///
/// # Preconditions
///
/// Attempts are serialized by the single-operator model: callers must not
/// issue a new `attempt` while one is in flight. `attempt` blocks until it
/// resolves, so the one execution context guarantees this.
pub struct ConnectionSupervisor<R, K> {
    radio: R,
    store: CredentialStore<K>,
    state: ConnectionState,
    current_ssid: Option<String>,
    retry: RetryPolicy,
}

impl<R: RadioControl, K: KvStore> ConnectionSupervisor<R, K> {
    pub fn new(radio: R, kv: K) -> Self {
        Self::with_retry(radio, kv, RetryPolicy::default())
    }

    pub fn with_retry(radio: R, kv: K, retry: RetryPolicy) -> Self {
        Self {
            radio,
            store: CredentialStore::new(kv),
            state: ConnectionState::Disconnected,
            current_ssid: None,
            retry,
        }
    }

    /// Last-known connection state. Cheap read, no driver query.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The credential that would be used for auto-reconnect, if any.
    pub fn stored_credential(&self) -> Option<Credential> {
        self.store.load()
    }

    /// Try to connect with `credential`, blocking until the link comes up or
    /// the retry budget is exhausted.
    ///
    /// The credential is persisted before the result is known, so the
    /// last-tried network is always available for the next boot. A failed
    /// attempt does not clear it. `progress` is invoked once per status
    /// poll so the console can show activity.
    ///
    /// Returns the assigned address on success (when the driver reports one).
    pub fn attempt(
        &mut self,
        credential: &Credential,
        is_auto_reconnect: bool,
        mut progress: impl FnMut(),
    ) -> Result<Option<String>, ConnectError> {
        self.store.save(credential);
        self.state = ConnectionState::Connecting;

        if is_auto_reconnect {
            info!("auto-reconnecting to {}", credential.ssid);
        } else {
            info!("connecting to {}", credential.ssid);
        }

        if let Err(e) = self.radio.connect(&credential.ssid, &credential.secret) {
            warn!("driver rejected connect to {}: {}", credential.ssid, e);
            self.state = ConnectionState::Failed;
            return Err(e.into());
        }
        if let Err(e) = self.radio.set_tx_power(TX_POWER_QUARTER_DBM) {
            warn!("failed to set tx power: {}", e);
        }

        let mut attempts = 0;
        while attempts < self.retry.max_attempts && !self.radio.is_connected() {
            std::thread::sleep(self.retry.poll_interval);
            attempts += 1;
            progress();
        }

        if self.radio.is_connected() {
            self.state = ConnectionState::Connected;
            self.current_ssid = Some(credential.ssid.clone());
            let address = self.radio.local_address();
            info!(
                "connected to {} ({})",
                credential.ssid,
                address.as_deref().unwrap_or("no address")
            );
            Ok(address)
        } else {
            self.state = ConnectionState::Failed;
            warn!(
                "giving up on {} after {} attempts",
                credential.ssid, attempts
            );
            Err(ConnectError::Timeout { attempts })
        }
    }

    /// Boot-time reconnect using whatever credential was last persisted.
    ///
    /// Leaves the state `Disconnected` when nothing is stored.
    pub fn auto_reconnect_on_boot(&mut self, progress: impl FnMut()) -> BootReconnect {
        let Some(credential) = self.store.load() else {
            info!("no stored credential, staying disconnected");
            return BootReconnect::NoCredential;
        };
        let ssid = credential.ssid.clone();
        match self.attempt(&credential, true, progress) {
            Ok(address) => BootReconnect::Connected { ssid, address },
            Err(error) => BootReconnect::Failed { ssid, error },
        }
    }

    /// Operator-requested disconnect: tear down the link and forget the
    /// stored credential. A supervisor-noticed drop (see [`Self::refresh`])
    /// keeps the credential; an explicit disconnect does not.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.radio.disconnect(false) {
            warn!("radio disconnect failed: {}", e);
        }
        self.state = ConnectionState::Disconnected;
        self.current_ssid = None;
        self.store.clear();
        info!("disconnected, credential cleared");
    }

    /// Re-check the link and fold a dropped connection into the state.
    /// Called from the poll tick; never blocks.
    pub fn refresh(&mut self) -> ConnectionState {
        if self.state == ConnectionState::Connected && !self.radio.is_connected() {
            warn!("link dropped");
            self.state = ConnectionState::Disconnected;
        }
        self.state
    }

    /// Scan for nearby networks. No state change.
    pub fn scan(&mut self) -> Result<Vec<ScanEntry>, RadioError> {
        self.radio.scan()
    }

    /// Current network id and assigned address, for the info display.
    pub fn info(&mut self) -> (Option<String>, Option<String>) {
        (self.current_ssid.clone(), self.radio.local_address())
    }

    /// Switch the radio operating mode.
    pub fn set_mode(&mut self, mode: RadioMode) -> Result<(), RadioError> {
        self.radio.set_mode(mode)
    }

    /// Disable the radio entirely. No connectivity until re-enabled.
    pub fn radio_off(&mut self) -> Result<(), RadioError> {
        if let Err(e) = self.radio.disconnect(true) {
            warn!("radio disconnect failed: {}", e);
        }
        self.radio.set_mode(RadioMode::Off)?;
        self.state = ConnectionState::Disconnected;
        self.current_ssid = None;
        info!("radio off");
        Ok(())
    }

    /// Re-enable the radio in station mode at the fixed transmit power.
    pub fn radio_on(&mut self) -> Result<(), RadioError> {
        self.radio.set_mode(RadioMode::Station)?;
        self.radio.set_tx_power(TX_POWER_QUARTER_DBM)?;
        info!("radio on");
        Ok(())
    }

    /// Wipe the stored credential without touching the connection.
    pub fn clear_credentials(&mut self) {
        self.store.clear();
        info!("stored credential cleared");
    }
}

#[cfg(test)]
impl<R, K> ConnectionSupervisor<R, K> {
    pub(crate) fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MemStore, MockRadio};

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            poll_interval: Duration::ZERO,
        }
    }

    fn supervisor(radio: MockRadio) -> ConnectionSupervisor<MockRadio, MemStore> {
        ConnectionSupervisor::with_retry(radio, MemStore::default(), fast_retry(20))
    }

    #[test]
    fn test_starts_disconnected() {
        let sup = supervisor(MockRadio::default());
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.stored_credential().is_none());
    }

    #[test]
    fn test_successful_attempt_connects_and_persists() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(3);
        radio.address = Some("192.168.1.50".to_string());
        let mut sup = supervisor(radio);

        let result = sup.attempt(&Credential::new("Home", ""), false, || {});
        assert_eq!(result, Ok(Some("192.168.1.50".to_string())));
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert_eq!(sup.stored_credential(), Some(Credential::new("Home", "")));
    }

    #[test]
    fn test_exhausted_attempt_fails_but_keeps_credential() {
        let mut sup = supervisor(MockRadio::default()); // link never comes up
        let cred = Credential::new("Home", "hunter22");

        let result = sup.attempt(&cred, false, || {});
        assert_eq!(result, Err(ConnectError::Timeout { attempts: 20 }));
        assert_eq!(sup.state(), ConnectionState::Failed);
        assert_eq!(sup.stored_credential(), Some(cred));
    }

    #[test]
    fn test_credential_persisted_even_when_driver_rejects() {
        let mut radio = MockRadio::default();
        radio.connect_error = Some(RadioError::InvalidSsid);
        let mut sup = supervisor(radio);

        let result = sup.attempt(&Credential::new("Home", ""), false, || {});
        assert_eq!(result, Err(ConnectError::Radio(RadioError::InvalidSsid)));
        assert_eq!(sup.state(), ConnectionState::Failed);
        // Saved before the driver was asked, so still present.
        assert!(sup.stored_credential().is_some());
    }

    #[test]
    fn test_progress_called_once_per_poll() {
        let mut sup = supervisor(MockRadio::default());
        let mut polls = 0;
        let _ = sup.attempt(&Credential::new("Home", ""), false, || polls += 1);
        assert_eq!(polls, 20);
    }

    #[test]
    fn test_new_attempt_supersedes_failed_one() {
        let mut sup = supervisor(MockRadio::default());
        let _ = sup.attempt(&Credential::new("Home", ""), false, || {});
        assert_eq!(sup.state(), ConnectionState::Failed);

        // Retry with a different network once the radio answers.
        sup.radio.link_after_polls = Some(0);
        let _ = sup.attempt(&Credential::new("Office", ""), false, || {});
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert_eq!(
            sup.stored_credential(),
            Some(Credential::new("Office", ""))
        );
    }

    #[test]
    fn test_refresh_notices_dropped_link() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(0);
        let mut sup = supervisor(radio);
        let _ = sup.attempt(&Credential::new("Home", ""), false, || {});
        assert_eq!(sup.refresh(), ConnectionState::Connected);

        sup.radio.drop_link();
        assert_eq!(sup.refresh(), ConnectionState::Disconnected);
        // Drop noticed by the supervisor keeps the credential for retry.
        assert!(sup.stored_credential().is_some());
    }

    #[test]
    fn test_disconnect_clears_credential() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(0);
        let mut sup = supervisor(radio);
        let _ = sup.attempt(&Credential::new("Home", "hunter22"), false, || {});

        sup.disconnect();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.stored_credential().is_none());
    }

    #[test]
    fn test_disconnect_when_disconnected_still_clears() {
        let mut kv = MemStore::default();
        kv.put_string(crate::config::KEY_SSID, "Home");
        let mut sup =
            ConnectionSupervisor::with_retry(MockRadio::default(), kv, fast_retry(3));
        assert_eq!(sup.state(), ConnectionState::Disconnected);

        sup.disconnect();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.stored_credential().is_none());
    }

    #[test]
    fn test_auto_reconnect_with_empty_store() {
        let mut sup = supervisor(MockRadio::default());
        let outcome = sup.auto_reconnect_on_boot(|| {});
        assert_eq!(outcome, BootReconnect::NoCredential);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.radio.events.is_empty(), "no connect attempt expected");
    }

    #[test]
    fn test_auto_reconnect_uses_stored_credential() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(1);
        radio.address = Some("10.0.0.7".to_string());
        let mut kv = MemStore::default();
        kv.put_string(crate::config::KEY_SSID, "Home");
        kv.put_string(crate::config::KEY_SECRET, "hunter22");
        let mut sup = ConnectionSupervisor::with_retry(radio, kv, fast_retry(20));

        let outcome = sup.auto_reconnect_on_boot(|| {});
        assert_eq!(
            outcome,
            BootReconnect::Connected {
                ssid: "Home".to_string(),
                address: Some("10.0.0.7".to_string()),
            }
        );
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(sup
            .radio
            .events
            .contains(&"connect Home \"hunter22\"".to_string()));
    }

    #[test]
    fn test_auto_reconnect_failure_keeps_credential() {
        let mut kv = MemStore::default();
        kv.put_string(crate::config::KEY_SSID, "Home");
        let mut sup =
            ConnectionSupervisor::with_retry(MockRadio::default(), kv, fast_retry(3));

        let outcome = sup.auto_reconnect_on_boot(|| {});
        assert_eq!(
            outcome,
            BootReconnect::Failed {
                ssid: "Home".to_string(),
                error: ConnectError::Timeout { attempts: 3 },
            }
        );
        assert_eq!(sup.state(), ConnectionState::Failed);
        assert!(sup.stored_credential().is_some());
    }

    #[test]
    fn test_radio_off_tears_down() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(0);
        let mut sup = supervisor(radio);
        let _ = sup.attempt(&Credential::new("Home", ""), false, || {});

        sup.radio_off().unwrap();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.radio.events.contains(&"disconnect clear=true".to_string()));
        assert!(sup.radio.events.contains(&"mode NULL".to_string()));
        // Radio off does not forget the credential.
        assert!(sup.stored_credential().is_some());
    }

    #[test]
    fn test_radio_on_restores_station_mode_and_power() {
        let mut sup = supervisor(MockRadio::default());
        sup.radio_on().unwrap();
        assert!(sup.radio.events.contains(&"mode STA".to_string()));
        assert!(sup.radio.events.contains(&"txpower 34".to_string()));
    }

    #[test]
    fn test_clear_credentials_leaves_state_alone() {
        let mut radio = MockRadio::default();
        radio.link_after_polls = Some(0);
        let mut sup = supervisor(radio);
        let _ = sup.attempt(&Credential::new("Home", ""), false, || {});

        sup.clear_credentials();
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(sup.stored_credential().is_none());
    }
}
