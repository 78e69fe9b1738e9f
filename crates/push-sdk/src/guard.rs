//! Session guard: decides whether a dropped connection is retried.
//!
//! ```text
//!            arm()                close, flag unset
//!   Idle ───────────▶ Armed ─────────────────────▶ ReconnectPending
//!                      ▲  │                          │   ▲
//!                 arm()│  │ close, flag set   timer  │   │ attempt failed
//!                      │  ▼                          ▼   │
//!                    Closed ◀──── close() ──── Reconnecting
//! ```
//!
//! Reconnection is unconditional: a fixed delay, no growth, no attempt cap.
//! It stops only on an explicit `close()`.

use std::time::Duration;

use tether_domain::trace::TraceEvent;
use tokio::sync::mpsc::UnboundedSender;

use crate::timer::TimerHandle;

/// Default pause between a lost connection and the next attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No session has opened yet.
    Idle,
    /// Watching a live session for an unexpected close.
    Armed,
    /// Reconnect timer running, no live session.
    ReconnectPending,
    /// The guard's reconnect attempt is in flight.
    Reconnecting,
    /// Application requested close; terminal until the next `open()`.
    Closed,
}

/// What the driver should do after a transport close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseDecision {
    Reconnect,
    Terminal,
    Ignore,
}

#[derive(Debug)]
pub(crate) struct SessionGuard {
    state: GuardState,
    delay: Duration,
    epoch: u64,
    timer: Option<TimerHandle>,
}

impl SessionGuard {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            state: GuardState::Idle,
            delay,
            epoch: 0,
            timer: None,
        }
    }

    pub(crate) fn state(&self) -> GuardState {
        self.state
    }

    /// Bind to a freshly opened session.  Cancels any superseded reconnect
    /// timer so two attempts never run side by side.
    pub(crate) fn arm(&mut self) {
        self.timer = None;
        self.state = GuardState::Armed;
    }

    pub(crate) fn on_close(&mut self, intentional: bool) -> CloseDecision {
        match self.state {
            GuardState::Armed if intentional => {
                self.state = GuardState::Closed;
                CloseDecision::Terminal
            }
            GuardState::Armed => {
                self.state = GuardState::ReconnectPending;
                CloseDecision::Reconnect
            }
            GuardState::Closed => CloseDecision::Terminal,
            _ => CloseDecision::Ignore,
        }
    }

    /// Start the reconnect timer.  `due` builds the message posted when it
    /// fires, tagged with the timer's epoch.
    pub(crate) fn schedule<T: Send + 'static>(
        &mut self,
        tx: &UnboundedSender<T>,
        due: impl FnOnce(u64) -> T,
    ) {
        self.epoch += 1;
        self.state = GuardState::ReconnectPending;
        self.timer = Some(TimerHandle::after(self.delay, tx.clone(), due(self.epoch)));
        TraceEvent::ReconnectScheduled {
            delay_ms: self.delay.as_millis() as u64,
        }
        .emit();
    }

    /// Consume a fired reconnect timer.  `true` means the driver should run
    /// `open()` now.
    pub(crate) fn on_timer(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.state != GuardState::ReconnectPending {
            return false;
        }
        self.timer = None;
        self.state = GuardState::Reconnecting;
        true
    }

    /// The guard's own attempt failed before a session opened.  `true`
    /// means another attempt should be scheduled.
    pub(crate) fn on_attempt_failed(&mut self) -> bool {
        self.state == GuardState::Reconnecting
    }

    pub(crate) fn close(&mut self) {
        self.timer = None;
        self.state = GuardState::Closed;
    }
}
