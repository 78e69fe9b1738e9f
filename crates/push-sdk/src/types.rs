//! Application-facing event and callback types.

use serde_json::Value;
use tether_domain::error::{Error, Result};
use tokio::sync::mpsc;

/// Events delivered to the application, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A transport session opened.  Login runs concurrently.
    Open,
    /// One payload from a data frame.  Payloads of the same frame arrive in
    /// array order.
    Message(Value),
    /// A failure nobody was waiting on.  Use [`Error::code`] for the server
    /// code, if any.
    Error(Error),
    /// The transport closed, intentionally or not.
    Close,
}

/// Receiving side of the event stream.
///
/// Keep it alive for as long as the client runs: an `Error` event that
/// cannot be delivered shuts the client down.
pub type PushEvents = mpsc::UnboundedReceiver<PushEvent>;

/// Completion callback for `open_with` / `send_with`.
pub type Callback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Where the outcome of one outbound write goes.
pub(crate) enum Completion {
    /// Failures become `Error` events; success is silent.
    Event,
    /// The login frame: completes the open waiters.
    Login,
    /// A caller-supplied callback.
    Callback(Callback),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Event => f.write_str("Event"),
            Completion::Login => f.write_str("Login"),
            Completion::Callback(_) => f.write_str("Callback"),
        }
    }
}
