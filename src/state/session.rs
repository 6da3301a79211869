//! Session state store — the shared record every other layer reads.
//!
//! ARCHITECTURE
//! ============
//! One [`SessionState`] exists per session context. All mutation goes
//! through named setters; the transition-signaling setters (game started /
//! ended, balance, grid shape) notify their listener registries so the
//! bootstrap sequencer and presentation layers can react without polling.
//!
//! DESIGN
//! ======
//! - Every mutation is synchronous and visible to subsequent reads
//!   immediately; there is no batching.
//! - Listeners fire AFTER the field lock is released, so a listener may
//!   read back any attribute without deadlocking.
//! - Edge-triggered signals: `set_game_started` only signals on an actual
//!   flag flip, `set_balance` only on a value change, `set_grid_dimensions`
//!   only when either dimension changed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::state::listeners::{ListenerHandle, ListenerRegistry};

/// Plain-data view of every session attribute, used for snapshot reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub token: String,
    pub table_id: String,
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub stake_amount: f64,
    pub round_id: Option<String>,
    pub current_row: Option<u32>,
    pub game_matrix: Option<Value>,
    pub reward: f64,
    pub balance: f64,
    pub game_started: bool,
    pub bet_steps: Vec<f64>,
}

/// Shared mutable session record with typed listener registries.
#[derive(Default)]
pub struct SessionState {
    fields: Mutex<SessionSnapshot>,
    game_started_listeners: ListenerRegistry<()>,
    game_ended_listeners: ListenerRegistry<()>,
    balance_listeners: ListenerRegistry<f64>,
    grid_listeners: ListenerRegistry<(u32, u32)>,
    restore_requested_listeners: ListenerRegistry<()>,
    restore_completed_listeners: ListenerRegistry<()>,
}

impl SessionState {
    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the full session record.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    // =========================================================================
    // STATE-ONLY SETTERS AND GETTERS
    // =========================================================================

    pub fn set_token(&self, token: String) {
        self.lock().token = token;
    }

    #[must_use]
    pub fn token(&self) -> String {
        self.lock().token.clone()
    }

    pub fn set_table_id(&self, table_id: String) {
        self.lock().table_id = table_id;
    }

    #[must_use]
    pub fn table_id(&self) -> String {
        self.lock().table_id.clone()
    }

    pub fn set_stake_amount(&self, amount: f64) {
        self.lock().stake_amount = amount;
    }

    #[must_use]
    pub fn stake_amount(&self) -> f64 {
        self.lock().stake_amount
    }

    pub fn set_round_id(&self, round_id: Option<String>) {
        self.lock().round_id = round_id;
    }

    #[must_use]
    pub fn round_id(&self) -> Option<String> {
        self.lock().round_id.clone()
    }

    pub fn set_current_row(&self, row: u32) {
        self.lock().current_row = Some(row);
    }

    #[must_use]
    pub fn current_row(&self) -> Option<u32> {
        self.lock().current_row
    }

    pub fn set_game_matrix(&self, matrix: Value) {
        self.lock().game_matrix = Some(matrix);
    }

    #[must_use]
    pub fn game_matrix(&self) -> Option<Value> {
        self.lock().game_matrix.clone()
    }

    pub fn set_reward(&self, reward: f64) {
        self.lock().reward = reward;
    }

    #[must_use]
    pub fn reward(&self) -> f64 {
        self.lock().reward
    }

    pub fn set_bet_steps(&self, steps: Vec<f64>) {
        self.lock().bet_steps = steps;
    }

    #[must_use]
    pub fn bet_steps(&self) -> Vec<f64> {
        self.lock().bet_steps.clone()
    }

    #[must_use]
    pub fn balance(&self) -> f64 {
        self.lock().balance
    }

    #[must_use]
    pub fn grid_cols(&self) -> u32 {
        self.lock().grid_cols
    }

    #[must_use]
    pub fn grid_rows(&self) -> u32 {
        self.lock().grid_rows
    }

    #[must_use]
    pub fn game_started(&self) -> bool {
        self.lock().game_started
    }

    // =========================================================================
    // TRANSITION-SIGNALING SETTERS
    // =========================================================================

    /// Update the game-started flag. A false→true flip fires game-started
    /// listeners, a true→false flip fires game-ended listeners, and writing
    /// the current value signals nothing.
    pub fn set_game_started(&self, started: bool) {
        let flipped = {
            let mut fields = self.lock();
            let flipped = fields.game_started != started;
            fields.game_started = started;
            flipped
        };
        if !flipped {
            return;
        }
        if started {
            self.game_started_listeners.emit(());
        } else {
            self.game_ended_listeners.emit(());
        }
    }

    /// Update the balance, notifying listeners only on a value change.
    pub fn set_balance(&self, balance: f64) {
        let changed = {
            let mut fields = self.lock();
            let changed = fields.balance != balance;
            fields.balance = balance;
            changed
        };
        if changed {
            self.balance_listeners.emit(balance);
        }
    }

    /// Update both grid dimensions, notifying listeners only when either
    /// value changed.
    pub fn set_grid_dimensions(&self, cols: u32, rows: u32) {
        let changed = {
            let mut fields = self.lock();
            let changed = fields.grid_cols != cols || fields.grid_rows != rows;
            fields.grid_cols = cols;
            fields.grid_rows = rows;
            changed
        };
        if changed {
            self.grid_listeners.emit((cols, rows));
        }
    }

    // =========================================================================
    // RESTORE SIGNALS
    // =========================================================================

    /// Signal that a pending round has been fully written to the store and
    /// presentation collaborators may now materialize it.
    pub fn trigger_pending_game_restore(&self) {
        self.restore_requested_listeners.emit(());
    }

    /// Relay from the presentation collaborator that materialization of a
    /// restored round has finished.
    pub fn notify_pending_restore_completed(&self) {
        self.restore_completed_listeners.emit(());
    }

    // =========================================================================
    // LISTENER REGISTRATION
    // =========================================================================

    pub fn on_game_started(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.game_started_listeners.add(move |()| callback())
    }

    pub fn on_game_ended(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.game_ended_listeners.add(move |()| callback())
    }

    pub fn on_balance_changed(
        &self,
        callback: impl Fn(f64) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.balance_listeners.add(callback)
    }

    pub fn on_grid_changed(
        &self,
        callback: impl Fn(u32, u32) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.grid_listeners.add(move |(cols, rows)| callback(cols, rows))
    }

    pub fn on_pending_restore_requested(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.restore_requested_listeners.add(move |()| callback())
    }

    pub fn on_pending_restore_completed(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.restore_completed_listeners.add(move |()| callback())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
