//! Endpoint resolution: ask the routing service which push server to use
//! and for how long.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tether_domain::config::ClientConfig;
use tether_domain::error::{Error, Result};
use tether_domain::trace::TraceEvent;
use tether_rest::from_reqwest;

/// A time-bounded grant of one push server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLease {
    /// WebSocket URL (`wss://…` or `ws://…`).
    pub server: String,
    pub expires: DateTime<Utc>,
}

impl ServerLease {
    /// Lease valid for `ttl_secs` from `now`.  Negative TTLs yield an
    /// already-expired lease; absurdly large ones saturate.
    pub fn new(server: impl Into<String>, ttl_secs: i64, now: DateTime<Utc>) -> Self {
        let expires = TimeDelta::try_seconds(ttl_secs.max(0))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            server: server.into(),
            expires,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Source of [`ServerLease`]s.  One call, one lookup: retry policy belongs
/// to the caller.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self) -> Result<ServerLease>;
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    server: Option<String>,
    #[serde(default)]
    ttl: i64,
}

/// Resolver backed by the HTTP routing service.
#[derive(Debug, Clone)]
pub struct RouterResolver {
    http: Client,
    url: Url,
}

impl RouterResolver {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            url: route_url(cfg)?,
        })
    }

    /// The routing query URL this resolver hits.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

/// `{base}/v1/route?appId=…[&secure=1]`, with the query form-encoded.
fn route_url(cfg: &ClientConfig) -> Result<Url> {
    let base = cfg.router_base_url();
    let mut params = vec![("appId", cfg.app_id())];
    if cfg.secure() {
        params.push(("secure", "1"));
    }
    Url::parse_with_params(&format!("{base}/v1/route"), &params)
        .map_err(|e| Error::Config(format!("invalid router url {base}: {e}")))
}

#[async_trait]
impl EndpointResolver for RouterResolver {
    async fn resolve(&self) -> Result<ServerLease> {
        tracing::debug!(url = %self.url, "resolving push server");
        let resp = self.http.get(self.url.clone()).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                Error::Json(format!("failed to parse route response: {e}: {text}"))
            } else {
                Error::Http(format!("router returned {status}: {text}"))
            }
        })?;
        if let Some(err) = Error::from_body(&body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(Error::Http(format!("router returned {status}: {text}")));
        }

        let route: RouteResponse = serde_json::from_value(body)?;
        let server = route
            .server
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Protocol(format!("route response without server: {text}")))?;

        TraceEvent::LeaseResolved {
            server: server.clone(),
            ttl_secs: route.ttl,
        }
        .emit();
        Ok(ServerLease::new(server, route.ttl, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_domain::config::{Installation, PushConfig};

    fn config(app_id: &str, secure: bool) -> ClientConfig {
        PushConfig {
            app_id: app_id.into(),
            app_key: "key".into(),
            installation: Installation::new("inst"),
            secure,
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn route_url_follows_region_and_secure_flag() {
        let url = route_url(&config("app", true)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://router-g0-push.leancloud.cn/v1/route?appId=app&secure=1"
        );
        let url = route_url(&config("app", false)).unwrap();
        assert_eq!(url.as_str(), "https://router-g0-push.leancloud.cn/v1/route?appId=app");
    }

    #[test]
    fn app_id_is_query_encoded() {
        let url = route_url(&config("a&b=c d", true)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://router-g0-push.leancloud.cn/v1/route?appId=a%26b%3Dc+d&secure=1"
        );
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1, "a&b=c d");
    }

    #[test]
    fn lease_expires_after_ttl() {
        let now = Utc::now();
        let lease = ServerLease::new("wss://push", 60, now);
        assert_eq!(lease.expires, now + TimeDelta::seconds(60));
        assert!(lease.is_valid_at(now));
        assert!(lease.is_valid_at(now + TimeDelta::seconds(59)));
        assert!(!lease.is_valid_at(now + TimeDelta::seconds(60)));
    }

    #[test]
    fn zero_or_negative_ttl_is_already_expired() {
        let now = Utc::now();
        assert!(!ServerLease::new("wss://push", 0, now).is_valid_at(now));
        assert!(!ServerLease::new("wss://push", -5, now).is_valid_at(now));
    }

    #[test]
    fn huge_ttl_saturates() {
        let now = Utc::now();
        let lease = ServerLease::new("wss://push", i64::MAX, now);
        assert!(lease.is_valid_at(now));
    }
}
