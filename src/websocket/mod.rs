//! WebSocket delivery endpoint
//!
//! One well-known path (`/ws`) shared by all clients. Each accepted
//! connection is driven by a session actor that attaches it to the
//! registry, handles the registration handshake, and forwards emitted
//! notifications until disconnect.

pub mod messages;
pub mod session;

pub use messages::{ClientEvent, ServerEvent};
pub use session::{register_routes, WsSession};
