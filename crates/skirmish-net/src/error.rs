//! Transport error taxonomy.
//!
//! Every error category maps to a distinct user-facing recovery action:
//! an invalid room code is rejected at input, an unreachable network or a
//! missing peer aborts the join, and a peer lost mid-session is handed to
//! the reconnection controller.

use std::io;

/// Errors surfaced by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The local network path to the rendezvous host is down.
    #[error("network unreachable")]
    NetworkUnreachable(#[source] io::Error),

    /// The room code is already claimed by another host on this rendezvous.
    #[error("room identity already in use")]
    IdentityInUse,

    /// The room code does not satisfy the identity format (≥4 alphanumerics).
    #[error("invalid room identity: {0}")]
    IdentityInvalid(String),

    /// No host is listening for this room.
    #[error("peer unavailable")]
    PeerUnavailable,

    /// A frame exceeded the negotiated maximum payload size.
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// The offending payload size.
        size: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// The peer closed the connection mid-frame or before one arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The user-facing action a [`TransportError`] calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-prompt for a different room code.
    RejectRoomCode,
    /// Retry (mid-session losses go through the reconnection controller).
    Retry,
    /// Abandon the attempt and return to the menu.
    Abort,
}

impl TransportError {
    /// Classify this error into its recovery action.
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::IdentityInUse | Self::IdentityInvalid(_) => Recovery::RejectRoomCode,
            Self::PeerUnavailable | Self::ConnectionClosed => Recovery::Retry,
            Self::NetworkUnreachable(_) | Self::FrameTooLarge { .. } | Self::Io(_) => {
                Recovery::Abort
            }
        }
    }
}

/// Map an outbound connect failure onto the transport taxonomy.
pub(crate) fn classify_connect_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => TransportError::PeerUnavailable,
        io::ErrorKind::NetworkUnreachable
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkDown
        | io::ErrorKind::TimedOut => TransportError::NetworkUnreachable(err),
        _ => TransportError::Io(err),
    }
}

/// Map a listener bind failure onto the transport taxonomy.
pub(crate) fn classify_bind_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::AddrInUse => TransportError::IdentityInUse,
        io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown => {
            TransportError::NetworkUnreachable(err)
        }
        _ => TransportError::Io(err),
    }
}
