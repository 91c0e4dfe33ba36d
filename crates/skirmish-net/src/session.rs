//! A single peer-to-peer transport session.
//!
//! One [`Session`] wraps one TCP stream. A spawned reader task turns inbound
//! frames into [`SessionEvent`]s on an mpsc channel; the writer half lives
//! behind a mutex so the tick loop and event handlers can share the handle.
//!
//! Sending on a closed (or already failed) session is a silent no-op. The
//! simulation broadcasts to every follower each tick and must not need
//! per-destination liveness checks; liveness is observed solely through the
//! event stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, watch};

use crate::error::{TransportError, classify_connect_error};
use crate::framing::{read_frame, write_frame};
use crate::room::PeerId;

/// Buffered events per session before the reader task backpressures.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle and traffic events for one session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A complete inbound frame payload.
    Message(Vec<u8>),
    /// The peer closed the connection (or it failed).
    Closed,
    /// A transport-level fault. Always followed by `Closed`.
    Error(TransportError),
}

/// Handle to one open peer connection.
pub struct Session {
    peer: PeerId,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    open: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    max_frame: usize,
}

impl Session {
    /// Connect to a room endpoint (follower side).
    ///
    /// Returns the session handle plus its event stream. Connection refusal
    /// maps to [`TransportError::PeerUnavailable`] — no host owns the room.
    pub async fn connect(
        addr: SocketAddr,
        peer: PeerId,
        max_frame: usize,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(classify_connect_error)?;
        stream.set_nodelay(true)?;
        Ok(Self::adopt(stream, peer, max_frame))
    }

    /// Wrap an already-accepted stream (host side).
    pub fn adopt(
        stream: TcpStream,
        peer: PeerId,
        max_frame: usize,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (reader, writer) = stream.into_split();
        let open = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task_open = Arc::clone(&open);
        let task_peer = peer.clone();
        tokio::spawn(async move {
            read_loop(reader, event_tx, task_open, shutdown_rx, max_frame, task_peer).await;
        });

        let session = Self {
            peer,
            writer: Arc::new(Mutex::new(writer)),
            open,
            shutdown_tx,
            max_frame,
        };
        (session, event_rx)
    }

    /// The peer identity bound to this session.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Whether the session is still believed open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Send one payload. Silent no-op if the session is closed or the write
    /// fails — failures surface through the event stream, never here.
    pub async fn send(&self, payload: &[u8]) {
        if !self.is_open() {
            return;
        }
        let mut writer = self.writer.lock().await;
        if let Err(e) = write_frame(&mut *writer, payload, self.max_frame).await {
            tracing::debug!(peer = %self.peer, "send failed, marking session closed: {e}");
            self.open.store(false, Ordering::Release);
        }
    }

    /// Close the session: stops the reader task and marks the handle closed.
    /// Further sends become no-ops immediately.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    events: mpsc::Sender<SessionEvent>,
    open: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_frame: usize,
    peer: PeerId,
) {
    loop {
        tokio::select! {
            result = read_frame(&mut reader, max_frame) => {
                match result {
                    // Zero-length frames are keepalives.
                    Ok(payload) if payload.is_empty() => {}
                    Ok(payload) => {
                        if events.send(SessionEvent::Message(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(TransportError::ConnectionClosed) => {
                        open.store(false, Ordering::Release);
                        let _ = events.send(SessionEvent::Closed).await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer, "session fault: {e}");
                        open.store(false, Ordering::Release);
                        let _ = events.send(SessionEvent::Error(e)).await;
                        let _ = events.send(SessionEvent::Closed).await;
                        break;
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                match changed {
                    Ok(()) => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    // Session handle dropped: stop reading.
                    Err(_) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::DEFAULT_MAX_FRAME;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn test_peer(n: u64) -> PeerId {
        PeerId::for_connection(n, "127.0.0.1:9".parse().unwrap())
    }

    /// Accept one connection and adopt it as a session.
    async fn accept_one(listener: TcpListener) -> (Session, mpsc::Receiver<SessionEvent>) {
        let (stream, _) = listener.accept().await.unwrap();
        stream.set_nodelay(true).unwrap();
        Session::adopt(stream, test_peer(1), DEFAULT_MAX_FRAME)
    }

    #[tokio::test]
    async fn test_bidirectional_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host_side = tokio::spawn(accept_one(listener));

        let (client, mut client_rx) = Session::connect(addr, test_peer(2), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let (host, mut host_rx) = host_side.await.unwrap();

        client.send(b"from follower").await;
        host.send(b"from host").await;

        let got = timeout(Duration::from_secs(5), host_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(got, SessionEvent::Message(p) if p == b"from follower"));

        let got = timeout(Duration::from_secs(5), client_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(got, SessionEvent::Message(p) if p == b"from host"));
    }

    #[tokio::test]
    async fn test_connect_refused_is_peer_unavailable() {
        // Bind then drop to get a port with (almost certainly) no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Session::connect(addr, test_peer(1), DEFAULT_MAX_FRAME)
            .await
            .err()
            .expect("connect to a dead port should fail");
        assert!(matches!(err, TransportError::PeerUnavailable));
    }

    #[tokio::test]
    async fn test_send_after_close_is_silent_noop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host_side = tokio::spawn(accept_one(listener));

        let (client, _client_rx) = Session::connect(addr, test_peer(2), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let _host = host_side.await.unwrap();

        client.close();
        assert!(!client.is_open());
        // Must not panic, error, or block.
        client.send(b"into the void").await;
        client.send(b"still nothing").await;
    }

    #[tokio::test]
    async fn test_peer_disconnect_emits_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host_side = tokio::spawn(accept_one(listener));

        let (client, _client_rx) = Session::connect(addr, test_peer(2), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let (_host, mut host_rx) = host_side.await.unwrap();

        client.close();
        drop(client);

        let got = timeout(Duration::from_secs(5), host_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(got, SessionEvent::Closed));
    }

    #[tokio::test]
    async fn test_keepalive_frames_are_swallowed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host_side = tokio::spawn(accept_one(listener));

        let (client, _client_rx) = Session::connect(addr, test_peer(2), DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        let (_host, mut host_rx) = host_side.await.unwrap();

        client.send(&[]).await;
        client.send(b"real").await;

        // The first event observed must be the real message, not the keepalive.
        let got = timeout(Duration::from_secs(5), host_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(got, SessionEvent::Message(p) if p == b"real"));
    }
}
