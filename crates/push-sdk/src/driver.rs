//! The driver: a single task that owns every piece of mutable client state.
//!
//! Facade commands, transport notifications, REST completions and timer
//! expiries all arrive as messages and are handled one at a time, so there
//! is no locking and no parallel mutation.  Helper tasks (resolution,
//! installation registration, the connection itself, timers) only ever post
//! back into the inbox.

use std::sync::Arc;

use serde_json::Value;
use tether_domain::config::ClientConfig;
use tether_domain::error::{Error, Result};
use tether_domain::trace::TraceEvent;
use tether_protocol::OutboundFrame;
use tether_rest::PushApi;
use tokio::sync::mpsc;

use crate::guard::{CloseDecision, SessionGuard};
use crate::handler::{Dispatch, ProtocolHandler};
use crate::resolver::{EndpointResolver, ServerLease};
use crate::session::{Session, SessionId, SessionState, TransportEvent};
use crate::types::{Callback, Completion, PushEvent};

/// Requests from the [`PushClient`](crate::PushClient) facade.
pub(crate) enum Command {
    Open(Option<Callback>),
    Close,
    Send {
        frame: Value,
        callback: Option<Callback>,
    },
}

/// Everything helper tasks post back to the driver.
#[derive(Debug)]
pub(crate) enum Input {
    Resolved {
        generation: u64,
        result: Result<ServerLease>,
    },
    Transport {
        session: SessionId,
        event: TransportEvent,
    },
    LoginReady {
        session: SessionId,
        result: Result<OutboundFrame>,
    },
    Written {
        session: SessionId,
        result: Result<()>,
        completion: Completion,
    },
    HeartbeatDue {
        session: SessionId,
        tick: u64,
    },
    ReconnectDue {
        epoch: u64,
    },
}

pub(crate) struct Driver {
    config: Arc<ClientConfig>,
    resolver: Arc<dyn EndpointResolver>,
    api: Arc<dyn PushApi>,
    handler: ProtocolHandler,
    events: mpsc::UnboundedSender<PushEvent>,
    inbox: mpsc::UnboundedSender<Input>,

    lease: Option<ServerLease>,
    session: Option<Session>,
    next_session: SessionId,
    guard: SessionGuard,
    /// Set only by an explicit `close()`; cleared by `open()`.
    close_requested: bool,
    resolving: bool,
    /// Bumped by `close()` so in-flight resolutions are discarded.
    generation: u64,
    /// Open callbacks waiting for the current attempt's login outcome.
    waiters: Vec<Callback>,
    /// Installation save or login write still outstanding.
    login_pending: bool,
    /// An `Error` event could not be delivered.
    fatal: bool,
}

impl Driver {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        resolver: Arc<dyn EndpointResolver>,
        api: Arc<dyn PushApi>,
        events: mpsc::UnboundedSender<PushEvent>,
        inbox: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            handler: ProtocolHandler::new(&config),
            guard: SessionGuard::new(config.reconnect_delay()),
            config,
            resolver,
            api,
            events,
            inbox,
            lease: None,
            session: None,
            next_session: 0,
            close_requested: false,
            resolving: false,
            generation: 0,
            waiters: Vec::new(),
            login_pending: false,
            fatal: false,
        }
    }

    /// Run until every facade handle is dropped or an error goes unobserved.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inbox: mpsc::UnboundedReceiver<Input>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        tracing::debug!("all client handles dropped");
                        break;
                    }
                },
                Some(input) = inbox.recv() => self.on_input(input),
            }
            if self.fatal {
                tracing::error!("event receiver dropped with an undelivered error; shutting down");
                break;
            }
        }
        self.close();
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Open(callback) => self.open(callback),
            Command::Close => self.close(),
            Command::Send { frame, callback } => {
                let completion = match callback {
                    Some(cb) => Completion::Callback(cb),
                    None => Completion::Event,
                };
                self.send_frame(OutboundFrame::Custom(frame), completion);
            }
        }
    }

    fn on_input(&mut self, input: Input) {
        match input {
            Input::Resolved { generation, result } => self.on_resolved(generation, result),
            Input::Transport { session, event } => self.on_transport(session, event),
            Input::LoginReady { session, result } => self.on_login_ready(session, result),
            Input::Written {
                session,
                result,
                completion,
            } => self.on_written(session, result, completion),
            Input::HeartbeatDue { session, tick } => self.on_heartbeat_due(session, tick),
            Input::ReconnectDue { epoch } => {
                if self.guard.on_timer(epoch) {
                    tracing::info!("reconnecting");
                    self.open(None);
                }
            }
        }
    }

    // ── open / close ────────────────────────────────────────────────

    fn open(&mut self, callback: Option<Callback>) {
        self.close_requested = false;
        if let Some(cb) = callback {
            self.waiters.push(cb);
        }

        if let Some(session) = &self.session {
            match session.state() {
                SessionState::Closing => {
                    tracing::debug!(session_id = session.id(), "retiring closing session for reopen");
                    self.session = None;
                    self.emit(PushEvent::Close);
                }
                _ if session.logged_in() => {
                    self.complete_waiters(Ok(()));
                    return;
                }
                SessionState::Open if !self.login_pending => {
                    // The earlier login failed; try again on the same socket.
                    let id = session.id();
                    self.start_login(id);
                    return;
                }
                // Join the attempt already in flight.
                _ => return,
            }
        }
        if self.resolving {
            return;
        }

        match &self.lease {
            Some(lease) if lease.is_valid() => {
                let server = lease.server.clone();
                self.connect(server);
            }
            _ => self.resolve(),
        }
    }

    fn close(&mut self) {
        let repeated = self.close_requested;
        self.close_requested = true;
        self.generation += 1;
        self.resolving = false;
        self.guard.close();
        if !self.waiters.is_empty() {
            self.complete_waiters(Err(Error::Closed));
        }

        let Some(session) = self.session.as_mut() else {
            if !repeated {
                tracing::debug!("close requested with no live session");
            }
            return;
        };
        match session.state() {
            SessionState::Connecting => {
                tracing::debug!(session_id = session.id(), "abandoning connection attempt");
                self.session = None;
            }
            SessionState::Open => {
                tracing::info!(
                    session_id = session.id(),
                    heartbeat_armed = session.heartbeat.is_armed(),
                    "closing transport"
                );
                session.close();
            }
            SessionState::Closing => {}
        }
    }

    fn resolve(&mut self) {
        self.resolving = true;
        let generation = self.generation;
        let resolver = self.resolver.clone();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = resolver.resolve().await;
            let _ = inbox.send(Input::Resolved { generation, result });
        });
    }

    fn on_resolved(&mut self, generation: u64, result: Result<ServerLease>) {
        if generation != self.generation {
            tracing::debug!("discarding resolution started before close()");
            return;
        }
        self.resolving = false;
        match result {
            Ok(lease) => {
                let server = lease.server.clone();
                self.lease = Some(lease);
                if self.session.is_none() {
                    self.connect(server);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "push server resolution failed");
                self.attempt_failed(e);
            }
        }
    }

    fn connect(&mut self, server: String) {
        self.next_session += 1;
        self.session = Some(Session::connect(
            self.next_session,
            server,
            self.config.heartbeat_interval(),
            self.inbox.clone(),
        ));
    }

    /// An open attempt failed before a session came up.
    fn attempt_failed(&mut self, error: Error) {
        self.report(error);
        if self.guard.on_attempt_failed() {
            self.guard.schedule(&self.inbox, |epoch| Input::ReconnectDue { epoch });
        }
    }

    // ── transport ───────────────────────────────────────────────────

    fn on_transport(&mut self, id: SessionId, event: TransportEvent) {
        if self.session.as_ref().map(Session::id) != Some(id) {
            tracing::trace!(session_id = id, ?event, "event from retired session");
            return;
        }
        match event {
            TransportEvent::ConnectFailed(e) => {
                tracing::warn!(session_id = id, error = %e, "connect failed");
                self.session = None;
                self.attempt_failed(e);
            }
            TransportEvent::Opened => self.on_open(id),
            TransportEvent::Frame(text) => self.on_frame(id, &text),
            TransportEvent::Error(e) => {
                tracing::warn!(session_id = id, error = %e, "transport error");
                self.report(e);
            }
            TransportEvent::Closed => self.on_closed(id),
        }
    }

    fn on_open(&mut self, id: SessionId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.mark_open();
        TraceEvent::SessionOpened {
            session_id: id,
            server: session.server().to_owned(),
        }
        .emit();

        // Initial keep-alive; later ones are driven by inbound idleness.
        self.send_frame(OutboundFrame::heartbeat(), Completion::Event);

        self.start_login(id);
        self.guard.arm();
        self.emit(PushEvent::Open);
    }

    fn start_login(&mut self, id: SessionId) {
        self.login_pending = true;
        let handler = self.handler.clone();
        let api = self.api.clone();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = handler.prepare_login(api).await;
            let _ = inbox.send(Input::LoginReady {
                session: id,
                result,
            });
        });
    }

    fn on_login_ready(&mut self, id: SessionId, result: Result<OutboundFrame>) {
        if self.session.as_ref().map(Session::id) != Some(id) {
            return;
        }
        match result {
            Ok(frame) => self.send_frame(frame, Completion::Login),
            Err(e) => {
                tracing::warn!(session_id = id, error = %e, "installation registration failed");
                self.login_finished(Err(e));
            }
        }
    }

    fn on_frame(&mut self, id: SessionId, text: &str) {
        // A closing session has stopped its heartbeat for good.
        if let Some(session) = self.session.as_mut().filter(|s| s.is_ready()) {
            session
                .heartbeat
                .reset(&self.inbox, |tick| Input::HeartbeatDue { session: id, tick });
        }

        match self.handler.handle(text) {
            Ok(Dispatch::Deliver { ack, payloads }) => {
                if let OutboundFrame::Command(tether_protocol::Command::Ack { ids, .. }) = &ack {
                    TraceEvent::FrameAcked {
                        session_id: id,
                        ids: ids.len(),
                    }
                    .emit();
                }
                self.send_frame(ack, Completion::Event);
                for payload in payloads {
                    self.emit(PushEvent::Message(payload));
                }
            }
            Ok(Dispatch::Ignore { cmd }) => {
                tracing::debug!(session_id = id, cmd = ?cmd, "ignoring frame");
            }
            Err(e) => self.emit_error(e),
        }
    }

    fn on_heartbeat_due(&mut self, id: SessionId, tick: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id() != id || !session.heartbeat.fire(tick) {
            return;
        }
        tracing::debug!(session_id = id, "idle; sending heartbeat");
        self.send_frame(OutboundFrame::heartbeat(), Completion::Event);
    }

    fn on_closed(&mut self, id: SessionId) {
        let Some(session) = self.session.take() else {
            return;
        };
        let intentional = self.close_requested;
        TraceEvent::SessionClosed {
            session_id: id,
            intentional,
        }
        .emit();

        if !session.logged_in() && !self.waiters.is_empty() {
            self.complete_waiters(Err(Error::Transport(
                "connection closed before login completed".into(),
            )));
        }
        drop(session);

        self.emit(PushEvent::Close);
        match self.guard.on_close(intentional) {
            CloseDecision::Reconnect => {
                tracing::warn!(
                    session_id = id,
                    delay_ms = self.config.reconnect_delay().as_millis() as u64,
                    "connection lost; scheduling reconnect"
                );
                self.guard.schedule(&self.inbox, |epoch| Input::ReconnectDue { epoch });
            }
            CloseDecision::Terminal => {
                tracing::info!(session_id = id, "connection closed");
            }
            CloseDecision::Ignore => {}
        }
        tracing::debug!(session_id = id, guard = ?self.guard.state(), "session retired");
    }

    // ── outbound ────────────────────────────────────────────────────

    fn send_frame(&mut self, frame: OutboundFrame, completion: Completion) {
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                self.complete(completion, Err(e.into()));
                return;
            }
        };
        tracing::trace!(kind = frame.kind(), "sending frame");
        let rejected = match self.session.as_ref() {
            Some(session) => session.write(text, completion).err(),
            None => Some(completion),
        };
        if let Some(completion) = rejected {
            self.complete(completion, Err(Error::NotReady));
        }
    }

    fn on_written(&mut self, id: SessionId, result: Result<()>, completion: Completion) {
        if matches!(completion, Completion::Login)
            && self.session.as_ref().map(Session::id) != Some(id)
        {
            return;
        }
        self.complete(completion, result);
    }

    fn complete(&mut self, completion: Completion, result: Result<()>) {
        match completion {
            Completion::Event => {
                if let Err(e) = result {
                    self.emit_error(e);
                }
            }
            Completion::Callback(cb) => cb(result),
            Completion::Login => self.login_finished(result),
        }
    }

    fn login_finished(&mut self, result: Result<()>) {
        self.login_pending = false;
        if result.is_ok() {
            if let Some(session) = self.session.as_mut() {
                session.mark_logged_in();
                tracing::info!(session_id = session.id(), "logged in");
            }
        }
        match result {
            Ok(()) => self.complete_waiters(Ok(())),
            Err(e) => self.report(e),
        }
    }

    // ── application events ──────────────────────────────────────────

    fn complete_waiters(&mut self, result: Result<()>) {
        for cb in self.waiters.drain(..) {
            cb(result.clone());
        }
    }

    /// Hand a failure to the open waiters, or to the event stream when
    /// nobody is waiting.
    fn report(&mut self, error: Error) {
        if self.waiters.is_empty() {
            self.emit_error(error);
        } else {
            self.complete_waiters(Err(error));
        }
    }

    fn emit(&mut self, event: PushEvent) {
        if let Err(mpsc::error::SendError(event)) = self.events.send(event) {
            match event {
                PushEvent::Error(e) => {
                    tracing::error!(error = %e, "unobserved push client error");
                    self.fatal = true;
                }
                other => tracing::trace!(event = ?other, "event receiver dropped"),
            }
        }
    }

    fn emit_error(&mut self, error: Error) {
        self.emit(PushEvent::Error(error));
    }
}
