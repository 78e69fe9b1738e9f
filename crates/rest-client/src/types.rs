//! Request bodies for the installation and push endpoints.
//!
//! Field names use `camelCase` on the wire.

use serde::{Deserialize, Serialize};

/// `POST /1.1/installations` body for channel subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdate {
    pub installation_id: String,
    pub device_type: String,
    pub channels: Channels,
}

/// Either the literal channel set (subscribe) or a `Remove` operation
/// (unsubscribe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Channels {
    Set(Vec<String>),
    Remove {
        #[serde(rename = "__op")]
        op: RemoveOp,
        objects: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveOp {
    Remove,
}

impl Channels {
    pub fn remove(objects: Vec<String>) -> Self {
        Channels::Remove {
            op: RemoveOp::Remove,
            objects,
        }
    }
}
