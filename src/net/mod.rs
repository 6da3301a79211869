//! Network layer: the reconnecting connection actor and the event router.

pub mod connection;
pub mod router;

pub use connection::Connection;
pub use router::{EventRouter, RequestError, Subscription};
