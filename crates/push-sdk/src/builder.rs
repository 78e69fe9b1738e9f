//! Builder pattern for constructing a [`PushClient`].

use std::sync::Arc;
use std::time::Duration;

use tether_domain::config::{Installation, PushConfig};
use tether_domain::error::Result;
use tether_rest::{PushApi, RestPushApi};

use crate::client::PushClient;
use crate::resolver::{EndpointResolver, RouterResolver};
use crate::types::PushEvents;

/// Fluent builder for [`PushClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use tether_client::{PushClientBuilder, PushEvent};
/// # async fn demo() -> tether_client::Result<()> {
/// let (client, mut events) = PushClientBuilder::new()
///     .app_id("my-app")
///     .app_key("my-key")
///     .installation_id("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4")
///     .region("cn")
///     .build()?;
///
/// client.open();
/// while let Some(event) = events.recv().await {
///     if let PushEvent::Message(msg) = event {
///         println!("{msg}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PushClientBuilder {
    config: PushConfig,
    resolver: Option<Arc<dyn EndpointResolver>>,
    api: Option<Arc<dyn PushApi>>,
}

impl PushClientBuilder {
    pub fn new() -> Self {
        Self {
            config: PushConfig::default(),
            resolver: None,
            api: None,
        }
    }

    /// Start from settings loaded elsewhere (e.g. `tether.toml`).
    pub fn from_config(config: PushConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    // ── Required ─────────────────────────────────────────────────────

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.config.app_key = app_key.into();
        self
    }

    /// Replace the whole installation record, extra fields included.
    pub fn installation(mut self, installation: Installation) -> Self {
        self.config.installation = installation;
        self
    }

    /// Set only the installation ID, keeping other installation fields.
    pub fn installation_id(mut self, id: impl Into<String>) -> Self {
        self.config.installation.installation_id = id.into();
        self
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `"cn"` (default) or `"us"`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    /// Use TLS for both REST and the push server (default `true`).
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    /// Override the REST API host (`host[:port]`).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Override the routing service base URL.
    pub fn router_url(mut self, url: impl Into<String>) -> Self {
        self.config.router_url = Some(url.into());
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    /// Idle time before a heartbeat is sent (default 30s).
    pub fn heartbeat_interval(mut self, d: Duration) -> Self {
        self.config.heartbeat_interval_ms = d.as_millis() as u64;
        self
    }

    /// Pause before reconnecting after an unexpected close (default 5s).
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.config.reconnect_delay_ms = d.as_millis() as u64;
        self
    }

    /// Timeout for REST and routing requests (default 5s).
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.config.request_timeout_ms = d.as_millis() as u64;
        self
    }

    // ── Collaborators ────────────────────────────────────────────────

    /// Replace the HTTP routing lookup.
    pub fn resolver(mut self, resolver: Arc<dyn EndpointResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the REST API client.
    pub fn push_api(mut self, api: Arc<dyn PushApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Validate the settings and start the client.  Must be called inside a
    /// Tokio runtime.  Nothing touches the network until `open()`.
    pub fn build(self) -> Result<(PushClient, PushEvents)> {
        let config = self.config.validate()?;

        let resolver = match self.resolver {
            Some(r) => r,
            None => Arc::new(RouterResolver::new(&config)?),
        };
        let api = match self.api {
            Some(a) => a,
            None => Arc::new(RestPushApi::new(&config)?),
        };

        PushClient::spawn(config, resolver, api)
    }
}

impl Default for PushClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_domain::error::Error;

    use crate::resolver::ServerLease;

    struct CountingResolver(AtomicUsize);

    #[async_trait]
    impl EndpointResolver for CountingResolver {
        async fn resolve(&self) -> Result<ServerLease> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(Error::Http("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_network_call() {
        let resolver = Arc::new(CountingResolver(AtomicUsize::new(0)));
        let err = PushClientBuilder::new()
            .app_key("key")
            .installation_id("inst")
            .resolver(resolver.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("app_id")));
        assert_eq!(resolver.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_installation_id_is_rejected() {
        let err = PushClientBuilder::new()
            .app_id("app")
            .app_key("key")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn unknown_region_is_rejected() {
        let err = PushClientBuilder::new()
            .app_id("app")
            .app_key("key")
            .installation_id("inst")
            .region("eu")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn build_does_not_resolve() {
        let resolver = Arc::new(CountingResolver(AtomicUsize::new(0)));
        let (client, _events) = PushClientBuilder::new()
            .app_id("app")
            .app_key("key")
            .installation_id("inst")
            .resolver(resolver.clone())
            .build()
            .unwrap();
        assert_eq!(client.config().app_id(), "app");
        assert_eq!(client.config().installation().device_type, "web");
        tokio::task::yield_now().await;
        assert_eq!(resolver.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn build_outside_runtime_is_a_config_error() {
        let err = PushClientBuilder::new()
            .app_id("app")
            .app_key("key")
            .installation_id("inst")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("runtime")));
    }
}
