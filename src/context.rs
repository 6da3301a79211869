//! Session context — the one object that owns the whole session layer.
//!
//! DESIGN
//! ======
//! The source relied on process-wide singletons for both the connection
//! and the session record. Here everything hangs off one explicit
//! [`SessionContext`], constructed at startup and passed by `Arc` to every
//! consumer. "One connection per process" survives as "one connection per
//! context" without hidden global state.

use std::sync::Arc;

use crate::bootstrap::{Bootstrap, ReadySignal};
use crate::config::ClientConfig;
use crate::host::HostBridge;
use crate::net::Connection;
use crate::state::SessionState;

/// Owns the state store, the transport connection, and the host bridge for
/// one game session.
pub struct SessionContext {
    pub config: ClientConfig,
    pub state: Arc<SessionState>,
    pub connection: Connection,
    pub bridge: Arc<dyn HostBridge>,
}

impl SessionContext {
    /// Seed the store from `config`, spawn the connection actor, and hand
    /// back the shared context. Must be called on a tokio runtime.
    #[must_use]
    pub fn start(config: ClientConfig, bridge: Arc<dyn HostBridge>) -> Arc<Self> {
        let state = Arc::new(SessionState::default());
        state.set_token(config.token.clone());
        state.set_table_id(config.table_id.clone());
        state.set_grid_dimensions(config.grid_cols, config.grid_rows);

        let connection = Connection::spawn(&config, state.clone(), bridge.clone());

        Arc::new(Self {
            config,
            state,
            connection,
            bridge,
        })
    }

    /// Build the resumption sequencer for this session.
    #[must_use]
    pub fn bootstrap(self: &Arc<Self>) -> (Bootstrap, ReadySignal) {
        Bootstrap::new(self.clone())
    }

    /// Close the connection and stop its actor.
    pub fn shutdown(&self) {
        self.connection.close();
    }
}
