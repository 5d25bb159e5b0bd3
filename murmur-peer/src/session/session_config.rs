use std::time::Duration;

/// Tunables of a [`crate::PeerSession`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How long teardown waits for a pending setup before abandoning it.
    pub teardown_timeout: Duration,
    /// Reason handed to the transport when a remote offer cannot be applied.
    pub close_reason: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            teardown_timeout: Duration::from_secs(5),
            close_reason: "Failed to set remote description".to_owned(),
        }
    }
}
