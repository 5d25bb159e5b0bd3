mod loopback;
mod signaling_channel;

pub use loopback::*;
pub use signaling_channel::*;
