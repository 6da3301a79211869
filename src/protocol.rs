//! Wire envelope and typed payloads for the game-server protocol.
//!
//! ARCHITECTURE
//! ============
//! Every message on the socket is a JSON [`Envelope`]. Outbound envelopes
//! carry an `operation` and optional `data`; inbound envelopes are keyed by
//! `event` when present, falling back to `operation`. Responses nest their
//! HTTP-flavored status string under `data.status` (and occasionally at the
//! top level), so status constants live here next to the envelope.
//!
//! DESIGN
//! ======
//! Payloads stay flexible (`serde_json::Value`); only the two responses the
//! bootstrap sequencer depends on get typed views ([`BalanceResponse`],
//! [`RoundSnapshot`]). Everything else is routed untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// OPERATION AND STATUS CONSTANTS
// =============================================================================

/// Balance query operation.
pub const OP_GET_BALANCE: &str = "getbalance";

/// Server-pushed configuration operation carrying bet steps.
pub const OP_INFO: &str = "info";

/// Nested status for a successful response.
pub const STATUS_OK: &str = "200 OK";

/// Nested status meaning "no round exists for this table".
pub const STATUS_NO_ROUND: &str = "400";

/// Nested status signalling that the authenticated session has expired.
pub const STATUS_SESSION_EXPIRED: &str = "401 Session Expired";

/// Pending-round query operation for the given game key, e.g.
/// `"minesweeper"` → `"minesweeper_load"`.
#[must_use]
pub fn load_operation(game_key: &str) -> String {
    format!("{game_key}_load")
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// A single JSON message on the persistent connection, in either direction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Server-push event name. Takes precedence over `operation` for routing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Operation name for requests and their responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Arbitrary payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Top-level status, rarely used; responses usually nest `data.status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Envelope {
    /// Build an outbound request envelope. A `Null` payload is omitted from
    /// the wire entirely, matching `{"operation":"getbalance"}`-style
    /// requests.
    #[must_use]
    pub fn request(operation: &str, payload: Value) -> Self {
        Self {
            event: None,
            operation: Some(operation.to_owned()),
            data: if payload.is_null() { None } else { Some(payload) },
            status: None,
        }
    }

    /// Routing key: `event` if present, else `operation`.
    #[must_use]
    pub fn dispatch_key(&self) -> Option<&str> {
        self.event.as_deref().or(self.operation.as_deref())
    }

    /// Whether this frame signals session expiry, checking the top-level
    /// status and the nested `data.status`.
    #[must_use]
    pub fn signals_expiry(&self) -> bool {
        if self.status.as_deref() == Some(STATUS_SESSION_EXPIRED) {
            return true;
        }
        self.data
            .as_ref()
            .and_then(|data| data.get("status"))
            .and_then(Value::as_str)
            == Some(STATUS_SESSION_EXPIRED)
    }

    /// Bet steps carried by an `info` frame, if any.
    #[must_use]
    pub fn bet_steps(&self) -> Option<Vec<f64>> {
        let steps = self.data.as_ref()?.get("mineSweeperAmounts")?.as_array()?;
        Some(steps.iter().filter_map(Value::as_f64).collect())
    }
}

// =============================================================================
// TYPED RESPONSE VIEWS
// =============================================================================

/// Payload of a `getbalance` response.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BalanceResponse {
    /// Current account balance. Absent on malformed responses.
    pub balance: Option<f64>,
}

/// Payload of a `<game>_load` response describing a possibly-pending round.
///
/// All fields default so a sparse response still deserializes; validity is
/// decided by the bootstrap classifier, not by serde.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoundSnapshot {
    /// Nested response status (`"200 OK"`, `"400"`, ...).
    pub status: Option<String>,
    /// Whether the server believes a round is still open for this table.
    pub has_existing_game: bool,
    /// Identifier of the open round. Empty or absent means none.
    pub round_id: Option<String>,
    /// Server-side row index, counted top-down.
    pub current_row: Option<u32>,
    /// Grid shape encoded as `"COLSxROWS"`.
    pub grid_option: Option<String>,
    /// Stake wagered on the open round.
    pub bet_amount: Option<f64>,
    /// Already-revealed board contents.
    pub revealed_matrix: Option<Value>,
    /// Cumulative reward per completed row.
    pub row_rewards: Vec<f64>,
    /// Explicit completion flag; overrides the row-bounds check.
    pub game_over: bool,
}

/// Parse a `"COLSxROWS"` grid encoding, e.g. `"5x6"` → `(5, 6)`.
#[must_use]
pub fn parse_grid_option(encoded: &str) -> Option<(u32, u32)> {
    let (cols, rows) = encoded.trim().split_once(['x', 'X'])?;
    Some((cols.trim().parse().ok()?, rows.trim().parse().ok()?))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
