use murmur_core::{IceConnectionState, PeerConnectionState, SessionId};

/// Observer of a session's state transitions.
///
/// Notifications are delivered from [`crate::PeerSession::poll`] on the host
/// thread, after the session's own state field has been updated, in the
/// order listeners were registered.
pub trait SessionListener: Send {
    fn on_connection_state_change(
        &mut self,
        _session_id: &SessionId,
        _state: PeerConnectionState,
    ) {
    }

    fn on_ice_connection_state_change(
        &mut self,
        _session_id: &SessionId,
        _state: IceConnectionState,
    ) {
    }
}

/// Handle returned by [`crate::PeerSession::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
