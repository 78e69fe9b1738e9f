mod installation;
mod region;

pub use installation::*;
pub use region::*;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File / builder shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw push client settings as read from `tether.toml`.
///
/// Nothing here is trusted until [`PushConfig::validate`] turns it into a
/// [`ClientConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub installation: Installation,
    #[serde(default = "d_region")]
    pub region: String,
    /// Ask the router for a `wss://` endpoint and talk to the REST API over
    /// `https://`.
    #[serde(default = "d_true")]
    pub secure: bool,
    /// REST API host override (`host[:port]`, no scheme).
    #[serde(default)]
    pub host: Option<String>,
    /// Routing service base URL override (scheme included).
    #[serde(default)]
    pub router_url: Option<String>,
    #[serde(default = "d_30000")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "d_5000")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "d_5000")]
    pub request_timeout_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_key: String::new(),
            installation: Installation::default(),
            region: d_region(),
            secure: true,
            host: None,
            router_url: None,
            heartbeat_interval_ms: 30_000,
            reconnect_delay_ms: 5_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl PushConfig {
    /// Check required fields and freeze the settings.
    pub fn validate(self) -> Result<ClientConfig> {
        if self.app_id.trim().is_empty() {
            return Err(Error::Config("app_id is required".into()));
        }
        if self.app_key.trim().is_empty() {
            return Err(Error::Config("app_key is required".into()));
        }
        if self.installation.installation_id.trim().is_empty() {
            return Err(Error::Config("installation.installationId is required".into()));
        }
        let region: Region = self.region.parse()?;
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::Config("heartbeat_interval_ms must be positive".into()));
        }

        let mut installation = self.installation;
        if installation.device_type.is_empty() {
            installation.device_type = "web".into();
        }

        Ok(ClientConfig {
            app_id: self.app_id,
            app_key: self.app_key,
            installation,
            region,
            secure: self.secure,
            host: self
                .host
                .filter(|h| !h.is_empty())
                .map(|h| h.trim_end_matches('/').to_owned()),
            router_url: self
                .router_url
                .filter(|u| !u.is_empty())
                .map(|u| u.trim_end_matches('/').to_owned()),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validated config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validated, read-only client configuration shared by every component.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    app_id: String,
    app_key: String,
    installation: Installation,
    region: Region,
    secure: bool,
    host: Option<String>,
    router_url: Option<String>,
    heartbeat_interval: Duration,
    reconnect_delay: Duration,
    request_timeout: Duration,
}

impl ClientConfig {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    pub fn installation_id(&self) -> &str {
        &self.installation.installation_id
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// REST host: explicit override, else the region default.
    pub fn api_host(&self) -> &str {
        self.host.as_deref().unwrap_or_else(|| self.region.api_host())
    }

    /// REST base URL, e.g. `https://leancloud.cn/1.1`.
    pub fn api_base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}/1.1", self.api_host())
    }

    /// Routing service base URL, e.g. `https://router-g0-push.leancloud.cn`.
    /// The resolver appends `/v1/route` and the encoded query.
    pub fn router_base_url(&self) -> String {
        match &self.router_url {
            Some(url) => url.clone(),
            None => format!("https://router-{}-push.leancloud.cn", self.region.router_node()),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_region() -> String {
    "cn".into()
}
fn d_true() -> bool {
    true
}
fn d_30000() -> u64 {
    30_000
}
fn d_5000() -> u64 {
    5_000
}
