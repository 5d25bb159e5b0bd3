mod handshake;
mod inbound_buffer;
mod peer_session;
mod session_config;
mod session_event;
mod session_listener;
mod session_registry;
mod setup;

pub use peer_session::*;
pub use session_config::*;
pub use session_event::SessionEvent;
pub use session_listener::*;
pub use session_registry::*;
