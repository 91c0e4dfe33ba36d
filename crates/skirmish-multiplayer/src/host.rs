//! The host-side session driver.
//!
//! Owns the listener, the lobby, and the authority tick loop, and bridges
//! them over channels: per-session reader tasks pump transport events into
//! one mpsc queue, the embedding game loop feeds commands and the host's
//! own avatar state in, and the freshest world snapshot is published on a
//! watch channel for the local renderer.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use skirmish_config::Config;
use skirmish_net::{PeerId, RoomId, Session, SessionEvent, SessionListener, TransportError};
use skirmish_world::{LootId, PlayerState, ReputationAction, UnitId, WorldSnapshot};

use crate::authority::{HostSimulation, SimSettings, TickSchedule, unix_now_ms};
use crate::dispatch::{HostReply, host_handle_message};
use crate::lobby::{ConnectionRegistry, LobbyRoster};
use crate::messages::{InitAssignment, Message, UnitCommand};
use crate::wire::{DEFAULT_COMPRESSION_THRESHOLD, encode_frame};

/// Delay before closing a rejected joiner so the LOBBY_FULL frame flushes.
const REJECT_GRACE: Duration = Duration::from_millis(500);

/// Inputs from the embedding game (UI, weapons, RTS layer) to the host
/// driver.
#[derive(Debug)]
pub enum HostCommand {
    /// The host's own avatar state for this tick.
    LocalPlayerState(PlayerState),
    /// Order the host player's own units around.
    IssueCommand {
        /// Affected units.
        unit_ids: Vec<UnitId>,
        /// The order.
        command: UnitCommand,
    },
    /// The host player damaged a unit.
    DamageUnit {
        /// Target unit.
        id: UnitId,
        /// Damage amount.
        amount: f32,
    },
    /// The host player took a supply cache.
    TakeLoot(LootId),
    /// The host player performed a reputation-moving action.
    RecordAction(ReputationAction),
    /// Leave the lobby, populate the world, begin the match.
    StartMatch,
    /// Tear the session down.
    Shutdown,
}

/// A bound room, ready to run.
pub struct HostSession {
    room: RoomId,
    host_peer: PeerId,
    listener: SessionListener,
    config: Config,
}

impl HostSession {
    /// Claim the room's rendezvous endpoint on all interfaces.
    pub async fn create(room: RoomId, config: &Config) -> Result<Self, TransportError> {
        let port = room.port(config.network.port_base, config.network.port_span);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        Self::bind_addr(room, addr, config).await
    }

    /// Claim a specific endpoint (tests bind loopback port 0).
    pub async fn bind_addr(
        room: RoomId,
        addr: SocketAddr,
        config: &Config,
    ) -> Result<Self, TransportError> {
        let max_frame = config.network.max_frame_kib as usize * 1024;
        let listener = SessionListener::bind(addr, max_frame).await?;
        let host_peer = PeerId::host(&room);
        tracing::info!(room = %room, "hosting as {}", host_peer);
        Ok(Self {
            room,
            host_peer,
            listener,
            config: config.clone(),
        })
    }

    /// The room this session hosts.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// The bound endpoint.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr()
    }

    /// Run the session until `Shutdown` (or the command channel closes).
    ///
    /// `snapshots` receives the freshest authoritative snapshot each tick —
    /// the host-side renderer reads world state there.
    pub async fn run(
        self,
        seed: u64,
        mut commands: mpsc::Receiver<HostCommand>,
        snapshots: watch::Sender<WorldSnapshot>,
    ) {
        let threshold = DEFAULT_COMPRESSION_THRESHOLD;
        let settings = SimSettings::from_config(&self.config);
        let mut sim = HostSimulation::new(seed, settings);
        let mut roster = LobbyRoster::new(self.host_peer.clone());
        let mut registry = ConnectionRegistry::new();
        let mut started = false;

        let (net_tx, mut net_rx) = mpsc::channel::<(PeerId, SessionEvent)>(1024);

        let rate = self.config.network.broadcast_rate_hz.max(1);
        let mut schedule = TickSchedule::with_rate(rate);
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(rate)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = tokio::time::Instant::now();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((session, events)) => {
                            admit_follower(
                                session, events, &sim, &mut roster, &mut registry,
                                &net_tx, started, threshold,
                            )
                            .await;
                        }
                        Err(e) => tracing::warn!("accept failed: {e}"),
                    }
                }

                Some((peer, event)) = net_rx.recv() => {
                    match event {
                        SessionEvent::Message(bytes) => match crate::wire::decode_frame(&bytes) {
                            Ok(msg) => {
                                let replies = host_handle_message(
                                    &mut sim, &mut roster, &peer, msg, unix_now_ms(),
                                );
                                send_replies(&registry, replies, threshold).await;
                            }
                            // Protocol errors are swallowed: drop + log.
                            Err(e) => tracing::warn!(peer = %peer, "dropping bad frame: {e}"),
                        },
                        SessionEvent::Error(e) => tracing::warn!(peer = %peer, "session fault: {e}"),
                        SessionEvent::Closed => {
                            if let Some(session) = registry.remove(&peer) {
                                session.close();
                            }
                            if let Some(slot) = roster.release(&peer) {
                                sim.remove_player(slot);
                                tracing::info!(peer = %peer, slot, "follower left, slot freed");
                                broadcast(&registry, &Message::LobbyState(roster.to_wire()), threshold)
                                    .await;
                            }
                        }
                    }
                }

                _ = ticker.tick() => {
                    let now = tokio::time::Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f64();
                    last_tick = now;
                    for _ in 0..schedule.accumulate(dt) {
                        let out = sim.tick(schedule.tick_duration_secs() as f32, unix_now_ms());
                        broadcast(&registry, &out.message, threshold).await;
                        for event in out.events {
                            broadcast(&registry, &Message::Event(event), threshold).await;
                        }
                    }
                    let _ = snapshots.send(sim.snapshot());
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(HostCommand::LocalPlayerState(mut state)) => {
                            state.identity = self.host_peer.as_str().to_string();
                            sim.buffer_player_state(0, state);
                        }
                        Some(HostCommand::IssueCommand { unit_ids, command }) => {
                            sim.issue_command(0, &unit_ids, &command);
                        }
                        Some(HostCommand::DamageUnit { id, amount }) => {
                            if let Some(event) = sim.apply_damage(id, amount, unix_now_ms()) {
                                broadcast(&registry, &Message::Event(event), threshold).await;
                            }
                        }
                        Some(HostCommand::TakeLoot(id)) => {
                            sim.take_loot(id);
                        }
                        Some(HostCommand::RecordAction(action)) => {
                            sim.record_action(action);
                        }
                        Some(HostCommand::StartMatch) => {
                            started = true;
                            sim.populate(&roster.occupied_slots());
                            broadcast(&registry, &Message::MatchStart, threshold).await;
                            let _ = snapshots.send(sim.snapshot());
                        }
                        Some(HostCommand::Shutdown) | None => {
                            tracing::info!(room = %self.room, "host session ending");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Seat a fresh inbound session, or reject it when the lobby is full.
async fn admit_follower(
    session: Session,
    events: mpsc::Receiver<SessionEvent>,
    sim: &HostSimulation,
    roster: &mut LobbyRoster,
    registry: &mut ConnectionRegistry,
    net_tx: &mpsc::Sender<(PeerId, SessionEvent)>,
    started: bool,
    threshold: usize,
) {
    let Some(slot) = roster.claim_first_free(session.peer().clone()) else {
        tracing::info!(peer = %session.peer(), "lobby full, rejecting joiner");
        if let Ok(frame) = encode_frame(&Message::LobbyFull, threshold) {
            // Grace delay lets the rejection flush before the close.
            tokio::spawn(async move {
                session.send(&frame).await;
                tokio::time::sleep(REJECT_GRACE).await;
                session.close();
            });
        }
        return;
    };

    let peer = session.peer().clone();
    tracing::info!(peer = %peer, slot, "follower seated");

    // Pump this session's events into the shared queue.
    let pump_tx = net_tx.clone();
    let pump_peer = peer.clone();
    let mut events = events;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if pump_tx.send((pump_peer.clone(), event)).await.is_err() {
                break;
            }
        }
    });

    let init = Message::InitAssignment(InitAssignment {
        slot,
        identity: peer.as_str().to_string(),
        world_seed: sim.world_seed(),
        reputation: sim.reputation(),
        time_of_day: sim.time_of_day(),
    });
    if let Ok(frame) = encode_frame(&init, threshold) {
        session.send(&frame).await;
    }

    // A joiner mid-match is brought current immediately — reconnection is
    // indistinguishable from a fresh join.
    if started
        && let Ok(frame) = encode_frame(&sim.full_sync(), threshold)
    {
        session.send(&frame).await;
    }

    registry.insert(session);
    broadcast(registry, &Message::LobbyState(roster.to_wire()), threshold).await;
}

async fn broadcast(registry: &ConnectionRegistry, msg: &Message, threshold: usize) {
    match encode_frame(msg, threshold) {
        Ok(frame) => registry.broadcast(&frame).await,
        Err(e) => tracing::error!("failed to encode broadcast: {e}"),
    }
}

async fn send_replies(registry: &ConnectionRegistry, replies: Vec<HostReply>, threshold: usize) {
    for reply in replies {
        match reply {
            HostReply::Broadcast(msg) => broadcast(registry, &msg, threshold).await,
            HostReply::To(peer, msg) => match encode_frame(&msg, threshold) {
                Ok(frame) => registry.send_to(&peer, &frame).await,
                Err(e) => tracing::error!("failed to encode reply: {e}"),
            },
        }
    }
}
