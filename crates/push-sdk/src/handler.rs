//! Push protocol handler: login sequencing and data-frame acknowledgment.

use std::sync::Arc;

use serde_json::Value;
use tether_domain::config::{ClientConfig, Installation};
use tether_domain::error::{Error, Result};
use tether_protocol::{Command, InboundFrame, OutboundFrame};
use tether_rest::PushApi;

/// Result of handling one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Dispatch {
    /// A data frame: send `ack`, then surface `payloads` in order.
    Deliver {
        ack: OutboundFrame,
        payloads: Vec<Value>,
    },
    /// Anything else (login ack, heartbeat ack, unknown command).
    Ignore { cmd: Option<String> },
}

#[derive(Debug, Clone)]
pub(crate) struct ProtocolHandler {
    app_id: String,
    installation: Installation,
}

impl ProtocolHandler {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            app_id: config.app_id().to_owned(),
            installation: config.installation().clone(),
        }
    }

    pub(crate) fn login_frame(&self) -> OutboundFrame {
        Command::Login {
            app_id: self.app_id.clone(),
            installation_id: self.installation.installation_id.clone(),
        }
        .into()
    }

    pub(crate) fn ack_frame(&self, ids: Vec<Value>) -> OutboundFrame {
        Command::Ack {
            app_id: self.app_id.clone(),
            installation_id: self.installation.installation_id.clone(),
            ids,
        }
        .into()
    }

    /// Register the installation, then hand back the login frame to send.
    /// A registration failure aborts the login before anything is written.
    pub(crate) async fn prepare_login(&self, api: Arc<dyn PushApi>) -> Result<OutboundFrame> {
        api.save_installation(&self.installation).await?;
        Ok(self.login_frame())
    }

    pub(crate) fn handle(&self, text: &str) -> Result<Dispatch> {
        let frame = InboundFrame::parse(text)
            .map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
        Ok(match frame {
            InboundFrame::Data(data) => Dispatch::Deliver {
                ack: self.ack_frame(data.ids),
                payloads: data.msg,
            },
            InboundFrame::Other { cmd } => Dispatch::Ignore { cmd },
        })
    }
}
