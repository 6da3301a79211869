//! Session bootstrap — pending-round discovery and restoration.
//!
//! ARCHITECTURE
//! ============
//! One finite sequence per session:
//!
//! ```text
//! Start → AwaitingBalance → AwaitingPendingCheck
//!     → NoPendingGame → Ready
//!     → PendingGameFound → Validating → Invalid → Ready
//!                                     → Valid → Restoring → Ready
//! ```
//!
//! Steps are chained through awaited request/response exchanges rather than
//! replacing event handlers; each await is bounded by the configured
//! response timeout so a stalled server fails open (fresh game, readiness
//! still fires) instead of blocking the UI forever.
//!
//! DESIGN
//! ======
//! Restoration is a two-phase commit: every store mutation happens
//! synchronously, then `trigger_pending_game_restore` fires synchronously.
//! Nothing here waits on timers for state to "settle".
//!
//! Classification ([`classify_round`]) and restoration ([`apply_restore`])
//! are free functions over plain data so they can be tested without a
//! socket.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::watch;

use crate::context::SessionContext;
use crate::protocol::{
    BalanceResponse, OP_GET_BALANCE, RoundSnapshot, STATUS_NO_ROUND, STATUS_OK, load_operation,
    parse_grid_option,
};
use crate::state::SessionState;

// =============================================================================
// OUTCOME
// =============================================================================

/// What the pending-round check concluded. Derived once per bootstrap;
/// never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResumptionOutcome {
    /// Whether a valid, unfinished round was found and restored.
    pub has_pending_game: bool,
    /// Round identifier, when pending.
    pub round_id: Option<String>,
    /// Server-reported top-down row index, when pending.
    pub current_row: Option<u32>,
    /// Grid shape from the response, when it carried one.
    pub grid: Option<(u32, u32)>,
    /// Stake on the pending round.
    pub bet_amount: Option<f64>,
    /// Cumulative reward per completed row.
    pub row_rewards: Vec<f64>,
    /// Revealed board contents.
    pub matrix: Option<Value>,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify a `<game>_load` response. `fallback_rows` is the store's grid
/// height, used when the response omits `gridOption`.
///
/// Fail-open policy: anything unrecognized means "no pending game".
#[must_use]
pub fn classify_round(snapshot: &RoundSnapshot, fallback_rows: u32) -> ResumptionOutcome {
    match snapshot.status.as_deref().unwrap_or("") {
        STATUS_NO_ROUND => {
            tracing::debug!("no pending round for table");
            ResumptionOutcome::default()
        }
        STATUS_OK => classify_open_round(snapshot, fallback_rows),
        other => {
            tracing::warn!(status = other, "unrecognized round status; treating as no pending round");
            ResumptionOutcome::default()
        }
    }
}

fn classify_open_round(snapshot: &RoundSnapshot, fallback_rows: u32) -> ResumptionOutcome {
    if !snapshot.has_existing_game {
        return ResumptionOutcome::default();
    }

    // A round without an id is treated as already completed.
    let Some(round_id) = snapshot.round_id.as_deref().filter(|id| !id.is_empty()) else {
        tracing::debug!("existing round lacks a round id; treating as completed");
        return ResumptionOutcome::default();
    };

    let grid = snapshot.grid_option.as_deref().and_then(parse_grid_option);
    let total_rows = grid.map_or(fallback_rows, |(_, rows)| rows);

    // Exhaustion wins over a non-empty round id: the row-bounds check is
    // the primary completion signal, the explicit flag the secondary one.
    let exhausted = snapshot.game_over
        || snapshot
            .current_row
            .is_some_and(|row| row.saturating_add(1) >= total_rows);
    if exhausted {
        tracing::debug!(round_id, "pending round already exhausted; not restoring");
        return ResumptionOutcome::default();
    }

    ResumptionOutcome {
        has_pending_game: true,
        round_id: Some(round_id.to_owned()),
        current_row: snapshot.current_row,
        grid,
        bet_amount: snapshot.bet_amount,
        row_rewards: snapshot.row_rewards.clone(),
        matrix: snapshot.revealed_matrix.clone(),
    }
}

// =============================================================================
// RESTORATION
// =============================================================================

/// Write a pending round into the store, then signal restoration.
///
/// Application order is part of the contract: matrix, grid dimensions,
/// stake, round id, derived current row, reward, game-started flag — and
/// only then the restore signal, so every listener observes a fully
/// consistent store.
///
/// The derived current row flips the server's top-down index to the
/// client's bottom-up index: `totalRows - 1 - reported`.
pub fn apply_restore(state: &SessionState, outcome: &ResumptionOutcome) {
    if let Some(matrix) = &outcome.matrix {
        state.set_game_matrix(matrix.clone());
    }
    if let Some((cols, rows)) = outcome.grid {
        state.set_grid_dimensions(cols, rows);
    }
    if let Some(bet) = outcome.bet_amount {
        state.set_stake_amount(bet);
    }
    state.set_round_id(outcome.round_id.clone());
    if let Some(reported) = outcome.current_row {
        let total = state.grid_rows();
        state.set_current_row(total.saturating_sub(1).saturating_sub(reported));
    }
    state.set_reward(outcome.row_rewards.last().copied().unwrap_or(0.0));
    state.set_game_started(true);

    state.trigger_pending_game_restore();
}

// =============================================================================
// SEQUENCER
// =============================================================================

/// Awaitable handle on the bootstrap's readiness signal. The loading
/// screen waits on this before revealing the interactive UI.
#[derive(Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// Resolve once readiness has been signalled. Also resolves if the
    /// bootstrap is dropped without running, so a discarded sequence can
    /// never wedge the loading screen.
    pub async fn wait(mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Non-blocking readiness probe.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }
}

/// The once-per-session resumption sequence.
pub struct Bootstrap {
    context: Arc<SessionContext>,
    ready_tx: watch::Sender<bool>,
}

impl Bootstrap {
    /// Pair a sequencer with the readiness signal collaborators wait on.
    #[must_use]
    pub fn new(context: Arc<SessionContext>) -> (Self, ReadySignal) {
        let (ready_tx, rx) = watch::channel(false);
        (Self { context, ready_tx }, ReadySignal { rx })
    }

    /// Execute the sequence. Consuming `self` makes the readiness signal
    /// structurally once-per-bootstrap: it fires on every terminal path,
    /// including fail-open ones.
    pub async fn run(self) -> ResumptionOutcome {
        let outcome = self.run_sequence().await;
        let _ = self.ready_tx.send(true);
        tracing::debug!(
            has_pending_game = outcome.has_pending_game,
            "bootstrap complete; readiness signalled"
        );
        outcome
    }

    async fn run_sequence(&self) -> ResumptionOutcome {
        let state = &self.context.state;

        // Start → AwaitingBalance.
        if let Some(data) = self.exchange(OP_GET_BALANCE, Value::Null).await {
            match serde_json::from_value::<BalanceResponse>(data) {
                Ok(BalanceResponse { balance: Some(balance) }) => state.set_balance(balance),
                Ok(BalanceResponse { balance: None }) => {
                    tracing::warn!("balance response missing balance field; continuing");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "malformed balance response; continuing");
                }
            }
        }

        // AwaitingBalance → AwaitingPendingCheck.
        let operation = load_operation(&self.context.config.game_key);
        let payload = json!({ "tableId": state.table_id() });
        let Some(data) = self.exchange(&operation, payload).await else {
            return ResumptionOutcome::default();
        };
        let snapshot = match serde_json::from_value::<RoundSnapshot>(data) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(error = %error, "malformed round response; treating as no pending round");
                return ResumptionOutcome::default();
            }
        };

        let outcome = classify_round(&snapshot, state.grid_rows());
        if outcome.has_pending_game {
            apply_restore(state, &outcome);
        }
        outcome
    }

    /// One request/response exchange, bounded by the response timeout.
    /// `None` means the step failed open.
    async fn exchange(&self, operation: &str, payload: Value) -> Option<Value> {
        let request = self.context.connection.request(operation, payload);
        match tokio::time::timeout(self.context.config.response_timeout, request).await {
            Ok(Ok(data)) => Some(data),
            Ok(Err(error)) => {
                tracing::warn!(error = %error, operation, "request superseded; failing open");
                None
            }
            Err(_) => {
                tracing::warn!(operation, "request timed out; failing open");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
