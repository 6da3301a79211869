//! Client configuration.
//!
//! DESIGN
//! ======
//! A plain struct with sensible defaults rather than ambient globals; the
//! host constructs one at startup and hands it to [`SessionContext`]
//! (`crate::SessionContext`). Durations exist so tests can shrink the
//! reconnect and response windows without touching production defaults.

use std::time::Duration;

/// Everything the session layer needs to know about its environment.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:3000/ws`. The session token
    /// is appended as a query credential on every connect attempt.
    pub ws_url: String,
    /// Initial session token, seeded into the state store.
    pub token: String,
    /// Identifier of the game table this client is bound to.
    pub table_id: String,
    /// Game key used to derive operation names (`"<game>_load"`).
    pub game_key: String,
    /// Default board shape, used until the server reports one.
    pub grid_cols: u32,
    pub grid_rows: u32,
    /// Fixed delay between reconnect attempts. No backoff growth: an
    /// unreachable server means indefinite fixed-interval retries.
    pub reconnect_delay: Duration,
    /// Bound on each bootstrap request/response exchange. A stalled server
    /// fails open instead of blocking readiness forever.
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:3000/ws".to_owned(),
            token: String::new(),
            table_id: String::new(),
            game_key: "minesweeper".to_owned(),
            grid_cols: 5,
            grid_rows: 6,
            reconnect_delay: Duration::from_millis(1000),
            response_timeout: Duration::from_secs(10),
        }
    }
}

/// Compose the connect URL with the token as a query credential.
#[must_use]
pub(crate) fn session_url(ws_url: &str, token: &str) -> String {
    format!("{ws_url}?token={token}")
}
