//! # minefield-client
//!
//! Connection/session layer for a real-time mines-style game client. The
//! crate keeps one logical session with the game server over a
//! reconnecting WebSocket and, on startup, detects, validates, and resumes
//! an in-progress round before letting the host drop its loading screen.
//!
//! Presentation is someone else's job: this crate exposes a state store
//! with listener registries, a transport handle, and a bootstrap readiness
//! signal, and consumes host capabilities through [`HostBridge`].
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use minefield_client::{ClientConfig, NullBridge, SessionContext};
//! # async fn example() {
//! let config = ClientConfig {
//!     ws_url: "wss://game.example/ws".to_owned(),
//!     token: "session-token".to_owned(),
//!     table_id: "table-1".to_owned(),
//!     ..ClientConfig::default()
//! };
//! let context = SessionContext::start(config, Arc::new(NullBridge));
//!
//! let (bootstrap, ready) = context.bootstrap();
//! tokio::spawn(bootstrap.run());
//! ready.wait().await; // loading screen comes down here
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod host;
pub mod net;
pub mod protocol;
pub mod state;

pub use bootstrap::{Bootstrap, ReadySignal, ResumptionOutcome};
pub use config::ClientConfig;
pub use context::SessionContext;
pub use host::{HostBridge, NullBridge};
pub use net::{Connection, RequestError, Subscription};
pub use state::{ListenerHandle, SessionSnapshot, SessionState};
