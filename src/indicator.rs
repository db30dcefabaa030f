//! Status indicator.
//!
//! Maps the connection state onto the single status pixel: green when
//! connected, yellow while connecting or initializing, red when down.

use crate::hal::{Rgb, StatusLed};
use crate::supervisor::ConnectionState;

/// Connected.
pub const GREEN: Rgb = Rgb::new(0, 255, 0);
/// Connecting or initializing.
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
/// Disconnected or failed.
pub const RED: Rgb = Rgb::new(255, 0, 0);

/// Pure color mapping for a connection state.
pub fn color_for(state: ConnectionState) -> Rgb {
    match state {
        ConnectionState::Connected => GREEN,
        ConnectionState::Connecting => YELLOW,
        ConnectionState::Disconnected | ConnectionState::Failed => RED,
    }
}

/// Drives the status pixel. Side effect only; the peripheral cannot fail
/// observably.
pub struct StatusIndicator<L> {
    pub(crate) led: L,
}

impl<L: StatusLed> StatusIndicator<L> {
    pub fn new(led: L) -> Self {
        Self { led }
    }

    /// Show the color for `state`.
    pub fn set_state(&mut self, state: ConnectionState) {
        self.led.set_all(color_for(state));
    }

    /// Boot-time yellow, before any connection state exists.
    pub fn show_initializing(&mut self) {
        self.led.set_all(YELLOW);
    }
}
