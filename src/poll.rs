//! Poll tick.
//!
//! Ties the supervisor and the status indicator together on a fixed
//! interval. The tick never blocks: it folds a dropped link into the
//! supervisor state and pushes the matching color to the pixel.
//!
//! While the operator has the menu open, a down state is not painted red;
//! the indicator is not required to be live during an active session.

use std::time::{Duration, Instant};

use crate::hal::{KvStore, RadioControl, StatusLed};
use crate::indicator::StatusIndicator;
use crate::supervisor::ConnectionSupervisor;

/// Fixed-interval driver for the status indicator.
pub struct PollLoop {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    /// Run one tick if the interval has elapsed. Call as often as the outer
    /// loop likes; does nothing between due times.
    pub fn tick<R: RadioControl, K: KvStore, L: StatusLed>(
        &mut self,
        supervisor: &mut ConnectionSupervisor<R, K>,
        indicator: &mut StatusIndicator<L>,
        in_menu: bool,
    ) {
        self.tick_at(Instant::now(), supervisor, indicator, in_menu);
    }

    /// Like [`Self::tick`] with an explicit clock, for tests.
    pub fn tick_at<R: RadioControl, K: KvStore, L: StatusLed>(
        &mut self,
        now: Instant,
        supervisor: &mut ConnectionSupervisor<R, K>,
        indicator: &mut StatusIndicator<L>,
        in_menu: bool,
    ) {
        if let Some(last) = self.last_tick {
            if now.duration_since(last) < self.interval {
                return;
            }
        }
        self.last_tick = Some(now);

        let state = supervisor.refresh();
        if state.is_down() && in_menu {
            // Menu open: leave whatever color is showing.
            return;
        }
        indicator.set_state(state);
    }
}
