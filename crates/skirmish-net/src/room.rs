//! Room codes, peer identities, and rendezvous address derivation.
//!
//! A room is identified by a short alphanumeric code typed by players. The
//! code deterministically selects a port inside a configured range on the
//! rendezvous host, so "same code" means "same endpoint" on both sides
//! without a lobby directory. The host claims the endpoint by listening on
//! it; a claim collision surfaces as [`TransportError::IdentityInUse`].

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::TransportError;

/// Minimum accepted room code length.
pub const MIN_ROOM_CODE_LEN: usize = 4;

/// A validated room code: at least four ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Validate and wrap a raw room code.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let trimmed = raw.trim();
        if trimmed.len() < MIN_ROOM_CODE_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(TransportError::IdentityInvalid(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The canonical (uppercased) code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic port for this room inside `[port_base, port_base + port_span)`.
    ///
    /// FNV-1a over the canonical code; both host and followers must agree,
    /// so the hash is fixed here rather than delegated to `std`'s
    /// randomized hasher.
    pub fn port(&self, port_base: u16, port_span: u16) -> u16 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in self.0.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        port_base + (hash % u64::from(port_span.max(1))) as u16
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque per-connection peer identity. Stable for the life of one transport
/// session only — a reconnect produces a fresh identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Identity for the hosting side of a room.
    pub fn host(room: &RoomId) -> Self {
        Self(format!("{}-host", room.as_str().to_ascii_lowercase()))
    }

    /// Identity minted by the host for an accepted connection.
    pub fn for_connection(serial: u64, remote: SocketAddr) -> Self {
        Self(format!("peer{}@{}", serial, remote))
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where room codes resolve: a host name plus a port range.
#[derive(Debug, Clone)]
pub struct RendezvousConfig {
    /// Host name or address the room port is opened on.
    pub host: String,
    /// First port of the range.
    pub port_base: u16,
    /// Number of ports room codes hash into.
    pub port_span: u16,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port_base: 42000,
            port_span: 512,
        }
    }
}

impl RendezvousConfig {
    /// Resolve the socket address a room's host listens on.
    pub fn room_addr(&self, room: &RoomId) -> Result<SocketAddr, TransportError> {
        let port = room.port(self.port_base, self.port_span);
        let mut addrs = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| TransportError::NetworkUnreachable(e))?;
        addrs
            .next()
            .ok_or_else(|| TransportError::NetworkUnreachable(std::io::Error::other(
                "rendezvous host resolved to no addresses",
            )))
    }
}
