mod transport;
mod transport_config;
mod transport_factory;
mod webrtc_transport;

pub use transport::*;
pub use transport_config::*;
pub use transport_factory::*;
pub use webrtc_transport::*;
