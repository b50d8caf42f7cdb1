//! Peer session lifecycle.

use std::fmt;

use tracing::debug;

use crate::error::Error;

/// States a peer session moves through.
///
/// `Connecting → Handshaking → (Subscribing | Ready) → Running → Closing →
/// Closed`; any protocol or transport error jumps to `Closing` with that
/// error recorded as the terminal cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connecting,
    Handshaking,
    Subscribing,
    Ready,
    Running,
    Closing,
    Closed,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerState::Connecting => "CONNECTING",
            PeerState::Handshaking => "HANDSHAKING",
            PeerState::Subscribing => "SUBSCRIBING",
            PeerState::Ready => "READY",
            PeerState::Running => "RUNNING",
            PeerState::Closing => "CLOSING",
            PeerState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one peer session and logs transitions.
#[derive(Debug)]
pub struct Lifecycle {
    role: &'static str,
    state: PeerState,
    cause: Option<String>,
}

impl Lifecycle {
    pub fn new(role: &'static str) -> Self {
        Self {
            role,
            state: PeerState::Connecting,
            cause: None,
        }
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    /// The error that forced the session into `Closing`, if any.
    pub fn terminal_cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn advance(&mut self, next: PeerState) {
        debug!(role = self.role, from = %self.state, to = %next, "peer state");
        self.state = next;
    }

    /// Record a terminal cause and move to `Closing`. The first cause
    /// wins.
    pub fn fail(&mut self, err: &Error) {
        if self.cause.is_none() {
            self.cause = Some(err.to_string());
        }
        self.advance(PeerState::Closing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lc = Lifecycle::new("client");
        assert_eq!(lc.state(), PeerState::Connecting);
        lc.advance(PeerState::Handshaking);
        lc.advance(PeerState::Ready);
        lc.advance(PeerState::Running);
        lc.advance(PeerState::Closing);
        lc.advance(PeerState::Closed);
        assert_eq!(lc.state(), PeerState::Closed);
        assert!(lc.terminal_cause().is_none());
    }

    #[test]
    fn test_first_failure_wins() {
        let mut lc = Lifecycle::new("orch");
        lc.fail(&Error::bad_frame("v3 header checksum mismatch"));
        lc.fail(&Error::ConnectionClosed);
        assert_eq!(lc.state(), PeerState::Closing);
        assert!(lc.terminal_cause().unwrap().contains("checksum"));
    }
}
