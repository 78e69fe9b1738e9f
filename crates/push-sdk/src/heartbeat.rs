//! Idle-driven keep-alive.
//!
//! The monitor does not tick on a fixed clock.  Every inbound frame calls
//! [`HeartbeatMonitor::reset`], which cancels the pending timer and arms a
//! fresh one; a heartbeat is due only when a full interval passes with no
//! traffic.  The heartbeat itself draws an ack from the server, which resets
//! the timer again.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::timer::TimerHandle;

#[derive(Debug)]
pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    tick: u64,
    timer: Option<TimerHandle>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            tick: 0,
            timer: None,
        }
    }

    /// Cancel the pending idle timer and arm a new one.  `due` builds the
    /// message posted when it fires, tagged with the timer's tick.
    pub(crate) fn reset<T: Send + 'static>(
        &mut self,
        tx: &UnboundedSender<T>,
        due: impl FnOnce(u64) -> T,
    ) {
        self.timer = None;
        self.tick += 1;
        self.timer = Some(TimerHandle::after(self.interval, tx.clone(), due(self.tick)));
    }

    /// Consume a fired timer.  Returns `false` for a tick that was superseded
    /// by a later reset or cancelled by [`stop`](Self::stop).
    pub(crate) fn fire(&mut self, tick: u64) -> bool {
        if tick == self.tick && self.timer.is_some() {
            self.timer = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn stop(&mut self) {
        self.timer = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.timer.is_some()
    }
}
