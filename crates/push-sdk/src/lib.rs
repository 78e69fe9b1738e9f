//! `tether-client`: persistent push connection client.
//!
//! A client holds one WebSocket connection to a push server, keeps it alive
//! with idle heartbeats, acknowledges every data frame it receives, and
//! reconnects after a fixed delay whenever the connection drops without the
//! application asking for it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Command   ┌──────────────────────────────────────────┐
//! │  PushClient  │──────────▶│  Driver task (owns all state)            │
//! │  (cloneable) │            │                                          │
//! └──────────────┘            │  lease cache ── SessionGuard ── waiters  │
//!        ▲                    │        │                                 │
//!        │ PushEvent          │        ▼                                 │
//! ┌──────┴───────┐            │  Session ── HeartbeatMonitor             │
//! │  PushEvents  │◀───────────│        │                                 │
//! └──────────────┘            └────────┼─────────────────────────────────┘
//!                                  ▲   │ spawn
//!                            Input │   ▼
//!                ┌─────────────────┴──────────────────────────┐
//!                │ resolver · connection task · login · timers │
//!                └────────────────────────────────────────────┘
//! ```
//!
//! # Connection flow
//!
//! 1. Resolve a push server through the routing service (skipped while the
//!    cached lease is still valid)
//! 2. Open the WebSocket and send a heartbeat `{}`
//! 3. Save the installation over REST, then send `login`
//! 4. Main loop:
//!    - On `data`: send one `ack` with the frame's IDs, then emit each payload
//!    - On any inbound frame: restart the idle heartbeat timer
//! 5. On unexpected close: wait 5 s, then start again from step 1

pub mod builder;
pub mod client;
mod driver;
pub mod guard;
mod handler;
mod heartbeat;
pub mod resolver;
mod session;
mod timer;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::PushClientBuilder;
pub use client::PushClient;
pub use guard::{GuardState, RECONNECT_DELAY};
pub use resolver::{EndpointResolver, RouterResolver, ServerLease};
pub use types::{Callback, PushEvent, PushEvents};

pub use tether_domain::config::{ClientConfig, Installation, PushConfig, Region};
pub use tether_domain::error::{Error, Result};
pub use tether_rest::{PushApi, RestPushApi};
