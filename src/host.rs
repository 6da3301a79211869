//! Host bridge — the capabilities the embedding host supplies to the core.
//!
//! DESIGN
//! ======
//! The session layer never reaches for ambient globals. Anything the host
//! page used to expose as a window-global callback is a named method on
//! this trait, supplied once at construction.

/// Capabilities the embedding host provides to the session layer.
pub trait HostBridge: Send + Sync {
    /// The server signalled session expiry; the host must end the
    /// authenticated session (logout). Expiry frames never reach event
    /// handlers — this is the only path they take.
    fn notify_session_expired(&self);

    /// An inactivity-timeout collaborator fired; the host decides how to
    /// surface it. The core never calls this itself.
    fn notify_inactivity_timeout(&self);
}

/// Bridge that ignores every notification. Useful for tests and headless
/// tooling.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBridge;

impl HostBridge for NullBridge {
    fn notify_session_expired(&self) {}

    fn notify_inactivity_timeout(&self) {}
}
