//! REST implementation of [`PushApi`].
//!
//! `RestPushApi` wraps a `reqwest::Client` preconfigured with the
//! application identity headers and the request timeout.  There is no retry
//! at this layer: every method issues exactly one request.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tether_domain::config::{ClientConfig, Installation};
use tether_domain::error::{Error, Result};
use tether_domain::trace::TraceEvent;

use crate::provider::PushApi;
use crate::types::{ChannelUpdate, Channels};

pub const APP_ID_HEADER: &str = "x-avoscloud-application-id";
pub const APP_KEY_HEADER: &str = "x-avoscloud-application-key";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the installation and push endpoints.
///
/// Created once per push client and reused; the underlying
/// `reqwest::Client` keeps a connection pool.
#[derive(Debug, Clone)]
pub struct RestPushApi {
    http: Client,
    base_url: String,
}

impl RestPushApi {
    /// Build a new client from the validated [`ClientConfig`].
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(APP_ID_HEADER, header_value(cfg.app_id())?);
        headers.insert(APP_KEY_HEADER, header_value(cfg.app_key())?);

        let http = Client::builder()
            .timeout(cfg.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.api_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and decode the body.
    ///
    /// * A body with an `error` field → `Error::Server` (code attached).
    /// * A non-2xx status without such a body → `Error::Http`.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Value> {
        let start = Instant::now();
        let result = rb.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::RestCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::RestCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        let text = resp.text().await.map_err(from_reqwest)?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => {
                    return Err(Error::Json(format!(
                        "failed to parse {endpoint} response: {e}: {text}"
                    )))
                }
                Err(_) => {
                    return Err(Error::Http(format!("{endpoint} returned {status}: {text}")))
                }
            }
        };

        if let Some(err) = Error::from_body(&body) {
            tracing::debug!(endpoint, code = ?err.code(), "server rejected request");
            return Err(err);
        }
        if !status.is_success() {
            return Err(Error::Http(format!("{endpoint} returned {status}: {text}")));
        }
        Ok(body)
    }

    async fn post_channels(&self, update: ChannelUpdate) -> Result<Value> {
        let url = self.url("/installations");
        self.execute("POST /installations", self.http.post(&url).json(&update))
            .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl PushApi for RestPushApi {
    async fn save_installation(&self, installation: &Installation) -> Result<Value> {
        let url = self.url("/installations");
        self.execute("POST /installations", self.http.post(&url).json(installation))
            .await
    }

    async fn send_push(&self, options: Value) -> Result<Value> {
        let url = self.url("/push");
        self.execute("POST /push", self.http.post(&url).json(&options))
            .await
    }

    async fn subscribe_channels(
        &self,
        installation: &Installation,
        channels: Vec<String>,
    ) -> Result<Value> {
        self.post_channels(ChannelUpdate {
            installation_id: installation.installation_id.clone(),
            device_type: installation.device_type.clone(),
            channels: Channels::Set(channels),
        })
        .await
    }

    async fn unsubscribe_channels(
        &self,
        installation: &Installation,
        channels: Vec<String>,
    ) -> Result<Value> {
        self.post_channels(ChannelUpdate {
            installation_id: installation.installation_id.clone(),
            device_type: installation.device_type.clone(),
            channels: Channels::remove(channels),
        })
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| Error::Config(format!("invalid header value: {e}")))
}
