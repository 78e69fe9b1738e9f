//! Cancellable one-shot timers that post into the driver inbox.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A pending timer.  Dropping the handle cancels it.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    _guard: DropGuard,
}

impl TimerHandle {
    /// Post `msg` into `tx` once `delay` has elapsed.
    pub(crate) fn after<T: Send + 'static>(delay: Duration, tx: UnboundedSender<T>, msg: T) -> Self {
        let deadline = tokio::time::Instant::now() + delay;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = tx.send(msg);
                }
                _ = cancelled.cancelled() => {}
            }
        });
        Self {
            _guard: token.drop_guard(),
        }
    }
}
