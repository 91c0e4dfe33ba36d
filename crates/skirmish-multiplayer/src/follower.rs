//! The follower-side session driver.
//!
//! Connects to a room, feeds the local avatar state up at the input rate,
//! applies everything the host sends, and publishes the replica for the
//! render layer. An unexpected close runs the backoff controller; once the
//! attempts are exhausted the session ends and the embedding UI falls back
//! to the menu. Reconnection needs no special re-sync path — the host
//! treats the new connection as a fresh join and sends a full snapshot.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use skirmish_config::Config;
use skirmish_net::{
    BackoffPolicy, LinkState, PeerId, ReconnectController, RendezvousConfig, RoomId, Session,
    SessionEvent, TransportError,
};
use skirmish_world::PlayerState;

use crate::authority::unix_now_ms;
use crate::dispatch::{FollowerOutcome, follower_handle_message};
use crate::messages::{DiscreteEvent, Message, RequestSlotSwitch};
use crate::replica::ReplicaWorld;
use crate::resume::ResumeRecord;
use crate::wire::{DEFAULT_COMPRESSION_THRESHOLD, decode_frame, encode_frame};

/// Observable session status, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerStatus {
    /// Dialing the room endpoint.
    Connecting,
    /// Seated (or waiting to be seated) in the lobby.
    Lobby,
    /// The match is running.
    InGame,
    /// Connection lost; a retry is scheduled.
    Reconnecting {
        /// Zero-based attempt counter.
        attempt: u32,
    },
    /// The session is over.
    Ended(EndReason),
}

/// Why a follower session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// All four slots were taken.
    LobbyFull,
    /// Nobody is hosting this room (first join failed).
    HostUnreachable,
    /// The host vanished and every reconnection attempt failed.
    ConnectionLost,
    /// The player quit.
    Quit,
}

/// Inputs from the embedding game to the follower driver.
#[derive(Debug)]
pub enum FollowerCommand {
    /// Ask the host for a different (empty) slot.
    RequestSlotSwitch(u8),
    /// Report a discrete event (loot taken, kill, order, action).
    Report(DiscreteEvent),
    /// Leave the session for good. Clears the resume record.
    Quit,
}

/// Join `room` and run the follower session to completion.
///
/// `own_state` carries the freshest local avatar state (sampled at the
/// input rate); `replica_out` publishes the replica after every applied
/// message for [`crate::RenderView::retarget`]. `data_dir` is where the
/// resume record lives; `None` disables persistence.
///
/// Returns `Err` only when the first connection cannot be established —
/// everything afterwards surfaces through `status`.
pub async fn run_follower(
    room: RoomId,
    config: &Config,
    data_dir: Option<PathBuf>,
    own_state: watch::Receiver<PlayerState>,
    mut commands: mpsc::Receiver<FollowerCommand>,
    status: watch::Sender<FollowerStatus>,
    replica_out: watch::Sender<ReplicaWorld>,
) -> Result<(), TransportError> {
    let rendezvous = RendezvousConfig {
        host: config.network.rendezvous_host.clone(),
        port_base: config.network.port_base,
        port_span: config.network.port_span,
    };
    let addr = rendezvous.room_addr(&room)?;
    let max_frame = config.network.max_frame_kib as usize * 1024;
    let host_peer = PeerId::host(&room);
    let policy = BackoffPolicy {
        base_delay: Duration::from_millis(config.reconnect.base_delay_ms),
        max_delay: Duration::from_millis(config.reconnect.max_delay_ms),
        max_attempts: config.reconnect.max_attempts,
        jitter: Duration::from_millis(config.reconnect.jitter_ms),
    };

    let _ = status.send(FollowerStatus::Connecting);
    let (mut session, mut events) = match Session::connect(addr, host_peer.clone(), max_frame).await
    {
        Ok(pair) => pair,
        Err(e) => {
            let _ = status.send(FollowerStatus::Ended(EndReason::HostUnreachable));
            return Err(e);
        }
    };
    let _ = status.send(FollowerStatus::Lobby);

    let mut replica = ReplicaWorld::new();
    let decay_ms = config.world.corpse_decay_ms;
    let mut joined = false;
    let input_rate = config.network.input_rate_hz.max(1);
    let mut input_timer =
        tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(input_rate)));

    'session: loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(SessionEvent::Message(bytes)) => {
                        let msg = match decode_frame(&bytes) {
                            Ok(msg) => msg,
                            // Protocol errors are swallowed: drop + log.
                            Err(e) => {
                                tracing::warn!("dropping bad frame: {e}");
                                continue 'session;
                            }
                        };
                        match follower_handle_message(&mut replica, msg, unix_now_ms(), decay_ms) {
                            FollowerOutcome::Assigned(slot) => {
                                joined = true;
                                tracing::info!(slot, "seated in room {}", room);
                                if let Some(dir) = &data_dir {
                                    let record = ResumeRecord { room_id: room.as_str().to_string() };
                                    if let Err(e) = record.store(dir) {
                                        tracing::warn!("could not persist resume record: {e}");
                                    }
                                }
                            }
                            FollowerOutcome::WorldRunning => {
                                let _ = status.send(FollowerStatus::InGame);
                            }
                            FollowerOutcome::Rejected => {
                                let _ = status.send(FollowerStatus::Ended(EndReason::LobbyFull));
                                session.close();
                                return Ok(());
                            }
                            FollowerOutcome::LobbyChanged | FollowerOutcome::None => {}
                        }
                        let _ = replica_out.send(replica.clone());
                    }
                    Some(SessionEvent::Error(e)) => {
                        tracing::warn!("session fault: {e}");
                    }
                    Some(SessionEvent::Closed) | None => {
                        session.close();
                        let mut controller = ReconnectController::new(policy.clone());
                        loop {
                            let Some(delay) = controller.next_delay() else {
                                tracing::error!("reconnection attempts exhausted, abandoning session");
                                let _ = status.send(FollowerStatus::Ended(EndReason::ConnectionLost));
                                return Ok(());
                            };
                            let attempt = match controller.state() {
                                LinkState::Reconnecting { attempt } => attempt,
                                LinkState::Connected => 0,
                            };
                            let _ = status.send(FollowerStatus::Reconnecting { attempt });
                            tracing::info!("reconnect attempt {attempt} in {delay:?}");
                            tokio::time::sleep(delay).await;

                            match Session::connect(addr, host_peer.clone(), max_frame).await {
                                Ok((new_session, new_events)) => {
                                    controller.on_reconnected();
                                    session = new_session;
                                    events = new_events;
                                    // The host reseats us and resends the
                                    // assignment + full snapshot.
                                    let _ = status.send(FollowerStatus::Lobby);
                                    continue 'session;
                                }
                                Err(e) => tracing::warn!("reconnect attempt {attempt} failed: {e}"),
                            }
                        }
                    }
                }
            }

            _ = input_timer.tick() => {
                if joined && replica.slot.is_some() {
                    let mut state = own_state.borrow().clone();
                    state.identity = replica.identity.clone();
                    if let Some(slot) = replica.slot {
                        state.slot = slot;
                    }
                    if let Ok(frame) =
                        encode_frame(&Message::FollowerState(state), DEFAULT_COMPRESSION_THRESHOLD)
                    {
                        session.send(&frame).await;
                    }
                }
            }

            cmd = commands.recv() => {
                match cmd {
                    Some(FollowerCommand::RequestSlotSwitch(target)) => {
                        let msg = Message::RequestSlotSwitch(RequestSlotSwitch { target });
                        if let Ok(frame) = encode_frame(&msg, DEFAULT_COMPRESSION_THRESHOLD) {
                            session.send(&frame).await;
                        }
                    }
                    Some(FollowerCommand::Report(event)) => {
                        if let Ok(frame) =
                            encode_frame(&Message::Event(event), DEFAULT_COMPRESSION_THRESHOLD)
                        {
                            session.send(&frame).await;
                        }
                    }
                    Some(FollowerCommand::Quit) | None => {
                        if let Some(dir) = &data_dir
                            && let Err(e) = ResumeRecord::clear(dir)
                        {
                            tracing::warn!("could not clear resume record: {e}");
                        }
                        session.close();
                        let _ = status.send(FollowerStatus::Ended(EndReason::Quit));
                        return Ok(());
                    }
                }
            }
        }
    }
}
