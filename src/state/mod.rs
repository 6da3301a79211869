//! Shared session-state modules.
//!
//! DESIGN
//! ======
//! Split between the generic listener machinery (`listeners`) and the
//! game-session record built on top of it (`session`) so the registry can
//! be tested and reused on its own.

pub mod listeners;
pub mod session;

pub use listeners::{ListenerHandle, ListenerRegistry};
pub use session::{SessionSnapshot, SessionState};
