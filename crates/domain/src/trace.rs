use serde::Serialize;

/// Structured trace events emitted across all Tether crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LeaseResolved {
        server: String,
        ttl_secs: i64,
    },
    RestCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    SessionOpened {
        session_id: u64,
        server: String,
    },
    SessionClosed {
        session_id: u64,
        intentional: bool,
    },
    ReconnectScheduled {
        delay_ms: u64,
    },
    FrameAcked {
        session_id: u64,
        ids: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tether_event");
    }
}
