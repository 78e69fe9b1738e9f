use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Installation descriptor: the device record registered with the REST API
/// before every login.
///
/// Fields other than `installationId` and `deviceType` are carried verbatim
/// in `extra` and sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    #[serde(rename = "installationId", alias = "installation_id", default)]
    pub installation_id: String,
    #[serde(rename = "deviceType", alias = "device_type", default = "d_web")]
    pub device_type: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Installation {
    pub fn new(installation_id: impl Into<String>) -> Self {
        Self {
            installation_id: installation_id.into(),
            device_type: d_web(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Attach an extra descriptor field (e.g. `timeZone`, `deviceToken`).
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fresh 32-character alphanumeric identifier.
    pub fn generate_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Default for Installation {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn d_web() -> String {
    "web".into()
}
