use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::core::protocol::PeerMessage;

/// Sending half of the peer channel. The network writer task owns the other end.
pub type Outbox = UnboundedSender<PeerMessage>;

/// Connection record shared by the session and every game.
///
/// Only the session mutates it; games read the host flag and push messages
/// through [`ConnectionState::send`].
#[derive(Debug, Default)]
pub struct ConnectionState {
    channel: Option<Outbox>,
    is_connected: bool,
    is_host: bool,
    session_code: Option<String>,
}

impl ConnectionState {
    /// Solo mode: no channel, nothing is ever sent.
    pub fn solo() -> Self {
        Self::default()
    }

    pub fn connected(channel: Outbox, is_host: bool) -> Self {
        Self {
            channel: Some(channel),
            is_connected: true,
            is_host,
            session_code: None,
        }
    }

    pub fn with_session_code(mut self, code: impl Into<String>) -> Self {
        self.session_code = Some(code.into());
        self
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    pub fn session_code(&self) -> Option<&str> {
        self.session_code.as_deref()
    }

    /// The channel stays in place after a disconnect; sends just go nowhere.
    pub fn mark_disconnected(&mut self) {
        self.is_connected = false;
    }

    /// Fire-and-forget: no acknowledgement, no retry.
    pub fn send(&self, msg: impl Into<PeerMessage>) {
        let Some(channel) = &self.channel else {
            return;
        };
        let msg = msg.into();
        debug!(kind = msg.kind(), "sending peer message");
        if channel.send(msg).is_err() {
            trace!("peer channel closed, message dropped");
        }
    }
}
