//! Per-peer voice signaling: drives a media transport through offer/answer
//! and ICE exchange while the host observes everything from one polling
//! thread.

pub mod audio;
pub mod error;
pub mod session;
pub mod signaling;
pub mod transport;

pub use audio::*;
pub use error::{Error, Result};
pub use session::*;
pub use signaling::*;
pub use transport::*;
