//! Transport session: one physical WebSocket connection.
//!
//! The connection runs in its own task.  Everything it observes (open,
//! frames, errors, close, write completions) is posted to the driver inbox
//! tagged with the session ID, so events from a retired session can be told
//! apart and dropped.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tether_domain::error::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::driver::Input;
use crate::heartbeat::HeartbeatMonitor;
use crate::types::Completion;

pub(crate) type SessionId = u64;

/// Upper bound on the TCP + TLS + WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a close frame may take to flush, and then how long the peer has
/// to answer it before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Connecting,
    Open,
    Closing,
}

/// Lifecycle notifications from the connection task.
#[derive(Debug)]
pub(crate) enum TransportEvent {
    /// The handshake never completed; no `Opened`/`Closed` will follow.
    ConnectFailed(Error),
    Opened,
    Frame(String),
    Error(Error),
    Closed,
}

enum Outbound {
    Frame { text: String, completion: Completion },
    Close,
}

#[derive(Debug)]
pub(crate) struct Session {
    id: SessionId,
    server: String,
    state: SessionState,
    logged_in: bool,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
    pub(crate) heartbeat: HeartbeatMonitor,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outbound::Frame { text, .. } => f.debug_tuple("Frame").field(text).finish(),
            Outbound::Close => f.write_str("Close"),
        }
    }
}

impl Session {
    /// Start connecting to `server`.  Returns immediately; the outcome
    /// arrives as a [`TransportEvent`].
    pub(crate) fn connect(
        id: SessionId,
        server: String,
        heartbeat_interval: Duration,
        inbox: mpsc::UnboundedSender<Input>,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_transport(id, server.clone(), inbox, outbound_rx));
        Self {
            id,
            server,
            state: SessionState::Connecting,
            logged_in: false,
            outbound,
            task,
            heartbeat: HeartbeatMonitor::new(heartbeat_interval),
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn server(&self) -> &str {
        &self.server
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn mark_open(&mut self) {
        self.state = SessionState::Open;
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state == SessionState::Open
    }

    pub(crate) fn logged_in(&self) -> bool {
        self.logged_in
    }

    pub(crate) fn mark_logged_in(&mut self) {
        self.logged_in = true;
    }

    /// Queue an encoded frame.  Hands the completion back when the session
    /// cannot take writes.
    pub(crate) fn write(&self, text: String, completion: Completion) -> Result<(), Completion> {
        if !self.is_ready() {
            return Err(completion);
        }
        self.outbound
            .send(Outbound::Frame { text, completion })
            .map_err(|e| match e.0 {
                Outbound::Frame { completion, .. } => completion,
                Outbound::Close => Completion::Event,
            })
    }

    /// Start the closing handshake.  Returns `false` if the session was not
    /// open (already closing, or never opened).
    pub(crate) fn close(&mut self) -> bool {
        if self.state != SessionState::Open {
            return false;
        }
        self.state = SessionState::Closing;
        self.heartbeat.stop();
        let _ = self.outbound.send(Outbound::Close);
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A closing session is left to finish its handshake on its own.
        if self.state != SessionState::Closing {
            self.task.abort();
        }
    }
}

/// Connection task: connect, then pump frames until the socket ends.
async fn run_transport(
    id: SessionId,
    server: String,
    inbox: mpsc::UnboundedSender<Input>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let post = |event: TransportEvent| {
        let _ = inbox.send(Input::Transport { session: id, event });
    };

    tracing::info!(session_id = id, server = %server, "connecting to push server");
    let connect = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(server.as_str()));
    let ws = match connect.await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => {
            post(TransportEvent::ConnectFailed(Error::Transport(e.to_string())));
            return;
        }
        Err(_) => {
            post(TransportEvent::ConnectFailed(Error::Timeout(format!(
                "connect to {server} timed out"
            ))));
            return;
        }
    };
    let (sink, mut stream) = ws.split();
    post(TransportEvent::Opened);

    let stop = CancellationToken::new();
    let close_sent = CancellationToken::new();
    let writer_task = tokio::spawn(write_loop(
        id,
        sink,
        outbound_rx,
        inbox.clone(),
        stop.clone(),
        close_sent.clone(),
    ));

    // Once our close frame is out, the peer gets CLOSE_TIMEOUT to answer.
    let close_deadline = async {
        close_sent.cancelled().await;
        tokio::time::sleep(CLOSE_TIMEOUT).await;
    };
    tokio::pin!(close_deadline);

    // Reader loop.
    loop {
        let msg = tokio::select! {
            msg = stream.next() => msg,
            _ = &mut close_deadline => {
                tracing::debug!(session_id = id, "peer did not answer close; dropping connection");
                break;
            }
        };
        let Some(msg) = msg else { break };
        match msg {
            Ok(Message::Text(text)) => post(TransportEvent::Frame(text)),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => post(TransportEvent::Frame(text)),
                Err(_) => tracing::debug!(session_id = id, "ignoring non-UTF-8 binary frame"),
            },
            Ok(Message::Close(frame)) => {
                tracing::debug!(session_id = id, ?frame, "server sent close");
            }
            Ok(_) => {}
            Err(
                tungstenite::Error::ConnectionClosed
                | tungstenite::Error::AlreadyClosed
                | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake),
            ) => break,
            Err(e) => {
                post(TransportEvent::Error(Error::Transport(e.to_string())));
                break;
            }
        }
    }

    // Every queued write is completed before the driver hears `Closed`.
    stop.cancel();
    if let Err(e) = writer_task.await {
        tracing::warn!(session_id = id, error = %e, "writer task failed");
    }
    post(TransportEvent::Closed);
}

/// Writer: drains the outbound queue into the socket until `stop` fires or
/// a close is requested, then fails whatever is still queued.
async fn write_loop<S>(
    id: SessionId,
    mut sink: S,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    inbox: mpsc::UnboundedSender<Input>,
    stop: CancellationToken,
    close_sent: CancellationToken,
) where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let written = |result: Result<(), Error>, completion: Completion| {
        let _ = inbox.send(Input::Written {
            session: id,
            result,
            completion,
        });
    };

    loop {
        let out = tokio::select! {
            _ = stop.cancelled() => break,
            out = outbound_rx.recv() => match out {
                Some(out) => out,
                None => break,
            },
        };
        match out {
            Outbound::Frame { text, completion } => {
                let result = tokio::select! {
                    res = sink.send(Message::Text(text)) => {
                        res.map_err(|e| Error::Transport(e.to_string()))
                    }
                    _ = stop.cancelled() => Err(connection_closed()),
                };
                written(result, completion);
            }
            Outbound::Close => {
                tokio::select! {
                    res = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()) => match res {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(session_id = id, error = %e, "close handshake failed");
                        }
                        Err(_) => tracing::debug!(session_id = id, "close frame not flushed in time"),
                    },
                    _ = stop.cancelled() => {}
                }
                close_sent.cancel();
                break;
            }
        }
    }

    outbound_rx.close();
    while let Ok(out) = outbound_rx.try_recv() {
        if let Outbound::Frame { completion, .. } = out {
            written(Err(connection_closed()), completion);
        }
    }
}

fn connection_closed() -> Error {
    Error::Transport("connection closed".into())
}
