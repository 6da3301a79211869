//! Transport connection — reconnecting WebSocket wrapper.
//!
//! ARCHITECTURE
//! ============
//! The socket is owned by a single actor task. Callers hold a cheap
//! [`Connection`] handle and never touch the socket: outbound commands go
//! through an unbounded channel, inbound frames are decoded by the actor
//! and handed to the [`EventRouter`]. The channel doubles as the outbound
//! FIFO queue — commands sent while the socket is down simply accumulate
//! and flush in order once a connection opens.
//!
//! LIFECYCLE
//! =========
//! 1. Spawn → connect to `<ws_url>?token=...` (token re-read from the
//!    store on every attempt, so a refreshed token is honored)
//! 2. Open → drain queued commands FIFO, then relay both directions
//! 3. Close or error → mark not-open, sleep the fixed reconnect delay,
//!    go to 1. No retry bound, no backoff growth.
//! 4. `close()` (or dropping the last handle) stops the actor.
//!
//! FAILURE SEMANTICS
//! =================
//! `send` never fails — it defers. A command whose write errors because
//! the socket died mid-transmission is carried over and flushed first on
//! the next connection, preserving FIFO order. Undecodable inbound frames
//! are logged and dropped. Session-expiry frames short-circuit to the host
//! bridge and never reach handlers. Connection loss is retried forever and
//! never surfaced to callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::{ClientConfig, session_url};
use crate::host::HostBridge;
use crate::net::router::{EventRouter, RequestError, Subscription};
use crate::protocol::{Envelope, OP_INFO};
use crate::state::SessionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// An outbound request: event key plus payload. Consumed exactly once.
struct Command {
    event_key: String,
    payload: Value,
}

/// Handle to the connection actor. Clone-free by design: one per
/// [`SessionContext`](crate::SessionContext), shared by reference.
pub struct Connection {
    command_tx: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
    router: EventRouter,
    shutdown_tx: watch::Sender<bool>,
}

impl Connection {
    /// Spawn the connection actor on the current tokio runtime and return
    /// the caller-side handle.
    #[must_use]
    pub fn spawn(
        config: &ClientConfig,
        state: Arc<SessionState>,
        bridge: Arc<dyn HostBridge>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));
        let router = EventRouter::default();

        let actor = ConnectionActor {
            ws_url: config.ws_url.clone(),
            reconnect_delay: config.reconnect_delay,
            command_rx,
            carryover: None,
            connected: connected.clone(),
            router: router.clone(),
            state,
            bridge,
            shutdown_rx,
        };
        tokio::spawn(actor.run());

        Self {
            command_tx,
            connected,
            router,
            shutdown_tx,
        }
    }

    /// Queue or transmit a command. Never fails: while the socket is down
    /// the command waits in the FIFO queue, and after shutdown it is
    /// dropped with a log line.
    pub fn send(&self, event_key: &str, payload: Value) {
        let command = Command {
            event_key: event_key.to_owned(),
            payload,
        };
        if self.command_tx.send(command).is_err() {
            tracing::warn!(key = event_key, "connection shut down; dropping command");
        }
    }

    /// Send a request and await the first inbound frame keyed by
    /// `operation`. A newer request on the same operation supersedes this
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Superseded`] if the waiter was replaced or
    /// the session shut down before a response arrived.
    pub async fn request(&self, operation: &str, payload: Value) -> Result<Value, RequestError> {
        let response = self.router.register_pending(operation);
        self.send(operation, payload);
        response.await.map_err(|_| RequestError::Superseded)
    }

    /// Subscribe to every inbound frame keyed by `event_key`.
    pub fn subscribe(
        &self,
        event_key: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.router.subscribe(event_key, callback)
    }

    /// True only while the underlying socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop the actor and close the socket. Queued commands are dropped.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Outcome of driving one open socket to its end.
enum SocketEnd {
    /// `close()` was called or every handle was dropped.
    Shutdown,
    /// The socket closed or errored; the reconnect loop takes over.
    Disconnected,
}

struct ConnectionActor {
    ws_url: String,
    reconnect_delay: Duration,
    command_rx: mpsc::UnboundedReceiver<Command>,
    /// Command whose write failed on a dying socket; retransmitted ahead
    /// of the queue on the next connection so FIFO order holds.
    carryover: Option<Command>,
    connected: Arc<AtomicBool>,
    router: EventRouter,
    state: Arc<SessionState>,
    bridge: Arc<dyn HostBridge>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Resolve once `close()` is called or every `Connection` handle is gone.
async fn wait_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

impl ConnectionActor {
    async fn run(mut self) {
        loop {
            let url = session_url(&self.ws_url, &self.state.token());
            tracing::debug!("connecting to game server");

            let attempt = tokio::select! {
                () = wait_shutdown(&mut self.shutdown_rx) => None,
                result = connect_async(url.as_str()) => Some(result),
            };
            let Some(result) = attempt else {
                return;
            };

            match result {
                Ok((socket, _response)) => {
                    tracing::info!("websocket connected");
                    self.connected.store(true, Ordering::SeqCst);
                    let end = self.drive(socket).await;
                    self.connected.store(false, Ordering::SeqCst);
                    tracing::info!("websocket connection closed");
                    if matches!(end, SocketEnd::Shutdown) {
                        return;
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "websocket connect failed");
                }
            }

            let stop = tokio::select! {
                () = wait_shutdown(&mut self.shutdown_rx) => true,
                () = tokio::time::sleep(self.reconnect_delay) => false,
            };
            if stop {
                return;
            }
        }
    }

    /// Relay frames in both directions until the socket dies or shutdown.
    async fn drive(&mut self, socket: WsStream) -> SocketEnd {
        let Self {
            command_rx,
            carryover,
            router,
            state,
            bridge,
            shutdown_rx,
            ..
        } = self;
        let (mut writer, mut reader) = socket.split();

        // A command stranded by the previous socket goes out first.
        if let Some(command) = carryover.take() {
            if let Err(command) = transmit(&mut writer, command).await {
                *carryover = Some(command);
                return SocketEnd::Disconnected;
            }
        }

        loop {
            tokio::select! {
                () = wait_shutdown(shutdown_rx) => {
                    let _ = writer.send(Message::Close(None)).await;
                    return SocketEnd::Shutdown;
                }
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        // Every handle dropped; nothing can send anymore.
                        let _ = writer.send(Message::Close(None)).await;
                        return SocketEnd::Shutdown;
                    };
                    if let Err(command) = transmit(&mut writer, command).await {
                        *carryover = Some(command);
                        return SocketEnd::Disconnected;
                    }
                }
                message = reader.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(router, state, bridge.as_ref(), text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => return SocketEnd::Disconnected,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::warn!(error = %error, "websocket receive error; forcing close");
                        return SocketEnd::Disconnected;
                    }
                },
            }
        }
    }
}

/// Serialize and transmit one command. A failed write hands the command
/// back so the caller can retransmit it on the next connection; only an
/// unserializable payload is ever dropped.
async fn transmit(writer: &mut WsWriter, command: Command) -> Result<(), Command> {
    let envelope = Envelope::request(&command.event_key, command.payload.clone());
    let text = match serde_json::to_string(&envelope) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(error = %error, key = %command.event_key, "unserializable command dropped");
            return Ok(());
        }
    };

    tracing::debug!(key = %command.event_key, "sending command");
    if let Err(error) = writer.send(Message::Text(text.into())).await {
        tracing::warn!(error = %error, "websocket send failed; command retained for reconnect");
        return Err(command);
    }
    Ok(())
}

/// Decode and route one inbound frame.
fn handle_frame(router: &EventRouter, state: &SessionState, bridge: &dyn HostBridge, raw: &str) {
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(error = %error, "discarding undecodable frame");
            return;
        }
    };

    // Expiry frames go to the host logout path and nowhere else.
    if envelope.signals_expiry() {
        tracing::info!("server signalled session expiry; handing off to host");
        bridge.notify_session_expired();
        return;
    }

    // Pushed bet-step configuration applies to the store whether or not
    // anything subscribed to the key.
    if envelope.operation.as_deref() == Some(OP_INFO) {
        if let Some(steps) = envelope.bet_steps() {
            state.set_bet_steps(steps);
        }
    }

    let Some(key) = envelope.dispatch_key() else {
        tracing::debug!("frame carries neither event nor operation; dropped");
        return;
    };
    let key = key.to_owned();

    // Handlers receive `data`, or the whole envelope when `data` is absent.
    let payload = match &envelope.data {
        Some(data) => data.clone(),
        None => serde_json::to_value(&envelope).unwrap_or(Value::Null),
    };
    router.dispatch(&key, payload);
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
