//! `tether-rest`: REST client for the installation and push endpoints.
//!
//! Provides the [`PushApi`] trait the push client depends on, and the
//! production [`RestPushApi`] implementation on `reqwest`.
//!
//! | Endpoint                   | Method                                      |
//! |----------------------------|---------------------------------------------|
//! | `POST /1.1/installations`  | `save_installation`, `(un)subscribe_channels` |
//! | `POST /1.1/push`           | `send_push`                                 |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tether_domain::config::{Installation, PushConfig};
//! use tether_rest::{PushApi, RestPushApi};
//!
//! # async fn example() -> tether_domain::error::Result<()> {
//! let cfg = PushConfig {
//!     app_id: "app".into(),
//!     app_key: "key".into(),
//!     installation: Installation::new(Installation::generate_id()),
//!     ..Default::default()
//! }
//! .validate()?;
//!
//! let api = RestPushApi::new(&cfg)?;
//! api.save_installation(cfg.installation()).await?;
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use provider::PushApi;
pub use rest::{from_reqwest, RestPushApi, APP_ID_HEADER, APP_KEY_HEADER};
pub use types::{ChannelUpdate, Channels};
