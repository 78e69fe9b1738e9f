//! Application-facing push client.
//!
//! [`PushClient`] is a cheap, cloneable handle.  Connection work happens in
//! the driver task; every method here only enqueues a command, so none of
//! them block.  Outcomes arrive either through a per-call callback or as
//! [`PushEvent`](crate::PushEvent)s.

use std::sync::Arc;

use serde_json::Value;
use tether_domain::config::ClientConfig;
use tether_domain::error::{Error, Result};
use tether_rest::PushApi;
use tokio::sync::{mpsc, oneshot};

use crate::driver::{Command, Driver, Input};
use crate::resolver::EndpointResolver;
use crate::types::{Callback, PushEvents};

/// Handle to a running push client.
///
/// Create via [`PushClientBuilder`](crate::builder::PushClientBuilder).
/// The driver stops once every clone of the handle has been dropped.
#[derive(Clone)]
pub struct PushClient {
    config: Arc<ClientConfig>,
    api: Arc<dyn PushApi>,
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for PushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushClient")
            .field("app_id", &self.config.app_id())
            .field("installation_id", &self.config.installation_id())
            .finish_non_exhaustive()
    }
}

impl PushClient {
    /// Start a new builder.
    pub fn builder() -> crate::builder::PushClientBuilder {
        crate::builder::PushClientBuilder::new()
    }

    /// Spawn the driver on the current Tokio runtime.
    pub(crate) fn spawn(
        config: ClientConfig,
        resolver: Arc<dyn EndpointResolver>,
        api: Arc<dyn PushApi>,
    ) -> Result<(Self, PushEvents)> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Config("PushClient must be built inside a Tokio runtime".into()))?;

        let config = Arc::new(config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel::<Input>();

        let driver = Driver::new(config.clone(), resolver, api.clone(), events_tx, inbox_tx);
        runtime.spawn(driver.run(commands_rx, inbox_rx));

        tracing::debug!(
            app_id = %config.app_id(),
            installation_id = %config.installation_id(),
            "push client started"
        );
        Ok((
            Self {
                config,
                api,
                commands: commands_tx,
            },
            events_rx,
        ))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Connect (or join the connection in progress).  Failures surface as
    /// `Error` events.
    pub fn open(&self) -> &Self {
        self.dispatch(Command::Open(None));
        self
    }

    /// Connect, and report the login outcome to `callback` instead of the
    /// event stream.
    pub fn open_with<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let callback: Callback = Box::new(callback);
        if let Err(cb) = self.dispatch_with(|cb| Command::Open(Some(cb)), callback) {
            cb(Err(Error::Closed));
        }
        self
    }

    /// Connect and wait until the login frame has been written.
    pub async fn open_async(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.open_with(move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(Error::Closed))
    }

    /// Close the connection and stop reconnecting.  Idempotent.
    pub fn close(&self) -> &Self {
        self.dispatch(Command::Close);
        self
    }

    // ── Frames ───────────────────────────────────────────────────────

    /// Write an arbitrary JSON frame.  Failures surface as `Error` events.
    pub fn send(&self, frame: Value) -> &Self {
        self.dispatch(Command::Send {
            frame,
            callback: None,
        });
        self
    }

    /// Write an arbitrary JSON frame and report the outcome to `callback`.
    pub fn send_with<F>(&self, frame: Value, callback: F) -> &Self
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let callback: Callback = Box::new(callback);
        if let Err(cb) = self.dispatch_with(
            |cb| Command::Send {
                frame,
                callback: Some(cb),
            },
            callback,
        ) {
            cb(Err(Error::Closed));
        }
        self
    }

    pub async fn send_async(&self, frame: Value) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send_with(frame, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(Error::Closed))
    }

    // ── REST passthrough ─────────────────────────────────────────────

    /// Send a push notification through the REST API.  `options` is posted
    /// as-is.
    pub async fn send_push(&self, options: Value) -> Result<Value> {
        self.api.send_push(options).await
    }

    /// Add this installation to `channels`.
    pub async fn subscribe_channels(&self, channels: Vec<String>) -> Result<Value> {
        self.api
            .subscribe_channels(self.config.installation(), channels)
            .await
    }

    /// Remove this installation from `channels`.
    pub async fn unsubscribe_channels(&self, channels: Vec<String>) -> Result<Value> {
        self.api
            .unsubscribe_channels(self.config.installation(), channels)
            .await
    }

    // ── Internals ────────────────────────────────────────────────────

    fn dispatch(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            tracing::warn!("push client driver has stopped; command dropped");
        }
    }

    /// Send a command carrying `callback`.  Hands the callback back if the
    /// driver is gone.
    fn dispatch_with(
        &self,
        make: impl FnOnce(Callback) -> Command,
        callback: Callback,
    ) -> std::result::Result<(), Callback> {
        match self.commands.send(make(callback)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(Command::Open(Some(cb))))
            | Err(mpsc::error::SendError(Command::Send {
                callback: Some(cb), ..
            })) => Err(cb),
            Err(_) => Ok(()),
        }
    }
}
