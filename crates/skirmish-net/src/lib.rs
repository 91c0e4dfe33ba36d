//! Peer-to-peer transport for Skirmish sessions: room-code rendezvous,
//! length-prefixed framing over TCP, session lifecycle events, and the
//! follower-side reconnection policy.
//!
//! The transport guarantees ordered, reliable delivery per connection (one
//! TCP stream per peer pair). Sync messages above this layer are built to be
//! idempotent/overwriting, so no acknowledgments or sequence numbers exist
//! here.

pub mod error;
pub mod framing;
pub mod listener;
pub mod reconnect;
pub mod room;
pub mod session;

pub use error::{Recovery, TransportError};
pub use framing::{DEFAULT_MAX_FRAME, read_frame, write_frame};
pub use listener::SessionListener;
pub use reconnect::{BackoffPolicy, LinkState, ReconnectController};
pub use room::{PeerId, RendezvousConfig, RoomId};
pub use session::{Session, SessionEvent};
