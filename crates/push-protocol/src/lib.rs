//! Push protocol: JSON frames exchanged over the WebSocket transport.
//!
//! Outbound frames are heartbeats (`{}`), `login` and `ack` commands, or a
//! caller-supplied JSON value.  Inbound frames are dispatched only when
//! `cmd == "data"`; every other shape is passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server command frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Authenticate this installation on the connection.
    #[serde(rename = "login")]
    Login {
        #[serde(rename = "appId")]
        app_id: String,
        #[serde(rename = "installationId")]
        installation_id: String,
    },

    /// Acknowledge the message IDs carried by one data frame.
    #[serde(rename = "ack")]
    Ack {
        #[serde(rename = "appId")]
        app_id: String,
        #[serde(rename = "installationId")]
        installation_id: String,
        ids: Vec<Value>,
    },
}

/// Keep-alive frame. Serializes to `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {}

/// Anything the client writes to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Command(Command),
    Heartbeat(Heartbeat),
    Custom(Value),
}

impl OutboundFrame {
    pub fn heartbeat() -> Self {
        OutboundFrame::Heartbeat(Heartbeat {})
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundFrame::Command(Command::Login { .. }) => "login",
            OutboundFrame::Command(Command::Ack { .. }) => "ack",
            OutboundFrame::Heartbeat(_) => "heartbeat",
            OutboundFrame::Custom(_) => "custom",
        }
    }
}

impl From<Command> for OutboundFrame {
    fn from(cmd: Command) -> Self {
        OutboundFrame::Command(cmd)
    }
}

/// Payload of a `{cmd: "data"}` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    #[serde(default)]
    pub msg: Vec<Value>,
    #[serde(default)]
    pub ids: Vec<Value>,
}

/// Server → client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Data(DataFrame),
    /// Login ack, heartbeat ack, or any command this client does not act on.
    Other { cmd: Option<String> },
}

impl InboundFrame {
    /// Parse one text frame.  Fails only on invalid JSON or a malformed
    /// `data` frame; unknown shapes decode as [`InboundFrame::Other`].
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        let cmd = value.get("cmd").and_then(Value::as_str).map(str::to_owned);
        match cmd.as_deref() {
            Some("data") => Ok(InboundFrame::Data(serde_json::from_value(value)?)),
            _ => Ok(InboundFrame::Other { cmd }),
        }
    }
}
