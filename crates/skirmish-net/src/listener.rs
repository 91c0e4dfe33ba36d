//! Host-side listener: claims a room endpoint and adopts inbound sessions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::error::{TransportError, classify_bind_error};
use crate::room::PeerId;
use crate::session::{Session, SessionEvent};

/// Listens on a room's rendezvous endpoint and yields one [`Session`] per
/// inbound connection, each tagged with a fresh [`PeerId`].
pub struct SessionListener {
    listener: TcpListener,
    serial: AtomicU64,
    max_frame: usize,
}

impl SessionListener {
    /// Claim the room endpoint. A bind collision means another host already
    /// owns this room code and maps to [`TransportError::IdentityInUse`].
    pub async fn bind(addr: SocketAddr, max_frame: usize) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(classify_bind_error)?;
        tracing::info!("room endpoint claimed on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            serial: AtomicU64::new(1),
            max_frame,
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next inbound connection as a session.
    pub async fn accept(
        &self,
    ) -> Result<(Session, mpsc::Receiver<SessionEvent>), TransportError> {
        let (stream, remote) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        let peer = PeerId::for_connection(self.serial.fetch_add(1, Ordering::Relaxed), remote);
        tracing::info!(peer = %peer, "inbound session accepted");
        Ok(Session::adopt(stream, peer, self.max_frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::DEFAULT_MAX_FRAME;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_double_bind_is_identity_in_use() {
        let first = SessionListener::bind("127.0.0.1:0".parse().unwrap(), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let err = SessionListener::bind(addr, DEFAULT_MAX_FRAME)
            .await
            .err()
            .expect("second bind on the same room endpoint must fail");
        assert!(matches!(err, TransportError::IdentityInUse));
    }

    #[tokio::test]
    async fn test_accepted_sessions_get_distinct_identities() {
        let listener = SessionListener::bind("127.0.0.1:0".parse().unwrap(), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = PeerId::for_connection(0, addr);
        let (_c1, _rx1) = Session::connect(addr, peer.clone(), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let (_c2, _rx2) = Session::connect(addr, peer, DEFAULT_MAX_FRAME).await.unwrap();

        let (s1, _e1) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let (s2, _e2) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();

        assert_ne!(s1.peer(), s2.peer());
    }
}
