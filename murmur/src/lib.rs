pub use murmur_core::{PeerUuid, SessionId};

pub mod model {
    pub use murmur_core::model::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use murmur_peer::*;
}
