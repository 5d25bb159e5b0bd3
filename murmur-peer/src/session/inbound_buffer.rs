use murmur_core::SignalingMessage;
use std::collections::VecDeque;

/// Signaling messages that arrived before the session's transport was ready,
/// in arrival order.
#[derive(Debug, Default)]
pub(crate) struct InboundBuffer {
    messages: VecDeque<SignalingMessage>,
}

impl InboundBuffer {
    pub(crate) fn push(&mut self, message: SignalingMessage) {
        self.messages.push_back(message);
    }

    /// Empties the buffer, oldest message first.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = SignalingMessage> + '_ {
        self.messages.drain(..)
    }

    /// Discards everything, returning how many messages were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.messages.len();
        self.messages.clear();
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }
}
