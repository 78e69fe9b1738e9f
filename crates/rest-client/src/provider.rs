//! The `PushApi` trait defines the REST surface the push client depends on
//! (production REST client, test doubles).

use async_trait::async_trait;
use serde_json::Value;
use tether_domain::config::Installation;
use tether_domain::error::Result;

/// Abstraction over the installation and push REST endpoints.
///
/// Every method returns the decoded response body on success.  A body
/// carrying an `error` field becomes `Error::Server` with the server code.
#[async_trait]
pub trait PushApi: Send + Sync {
    /// Register or refresh the installation record (POST /1.1/installations).
    async fn save_installation(&self, installation: &Installation) -> Result<Value>;

    /// Submit a push with caller-supplied options (POST /1.1/push).
    async fn send_push(&self, options: Value) -> Result<Value>;

    /// Add channels to the installation (POST /1.1/installations).
    async fn subscribe_channels(
        &self,
        installation: &Installation,
        channels: Vec<String>,
    ) -> Result<Value>;

    /// Remove channels from the installation (POST /1.1/installations).
    async fn unsubscribe_channels(
        &self,
        installation: &Installation,
        channels: Vec<String>,
    ) -> Result<Value>;
}
