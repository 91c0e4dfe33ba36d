//! Message dispatch: the semantics table of the replication protocol,
//! matched exhaustively on both ends.
//!
//! These functions are synchronous and side-effect the simulation/replica
//! directly; replies come back as values so the async drivers own all I/O.
//! A message arriving at the wrong end (e.g. a `FullSync` at the host) is
//! dropped with a debug log — tolerated, never fatal.

use skirmish_net::PeerId;

use crate::authority::HostSimulation;
use crate::lobby::LobbyRoster;
use crate::messages::{DiscreteEvent, Message};
use crate::replica::ReplicaWorld;

/// A send the host driver must perform after dispatching a message.
#[derive(Debug, Clone, PartialEq)]
pub enum HostReply {
    /// Send to every connected follower.
    Broadcast(Message),
    /// Send to one follower.
    To(PeerId, Message),
}

/// Host-side dispatch for one inbound message.
pub fn host_handle_message(
    sim: &mut HostSimulation,
    roster: &mut LobbyRoster,
    from: &PeerId,
    msg: Message,
    now_ms: u64,
) -> Vec<HostReply> {
    match msg {
        Message::RequestSlotSwitch(req) => {
            if roster.switch(from, req.target) {
                vec![HostReply::Broadcast(Message::LobbyState(roster.to_wire()))]
            } else {
                tracing::debug!(peer = %from, target = req.target, "slot switch denied");
                Vec::new()
            }
        }

        Message::FollowerState(state) => {
            // Only seated peers feed input, and only into their own slot.
            if let Some(slot) = roster.slot_of(from) {
                let mut state = state;
                state.identity = from.as_str().to_string();
                sim.buffer_player_state(slot, state);
            } else {
                tracing::debug!(peer = %from, "input from unseated peer dropped");
            }
            Vec::new()
        }

        Message::Event(event) => host_handle_event(sim, roster, from, event, now_ms),

        // Host-to-follower traffic arriving at the host: tolerated, dropped.
        Message::InitAssignment(_)
        | Message::LobbyState(_)
        | Message::FullSync(_)
        | Message::DeltaSync(_)
        | Message::LobbyFull
        | Message::MatchStart => {
            tracing::debug!(peer = %from, "ignoring follower-bound message at host");
            Vec::new()
        }
    }
}

fn host_handle_event(
    sim: &mut HostSimulation,
    roster: &LobbyRoster,
    from: &PeerId,
    event: DiscreteEvent,
    now_ms: u64,
) -> Vec<HostReply> {
    match event {
        DiscreteEvent::LootTaken { id } => {
            // The taken flag rides the next delta; nothing to send now.
            if !sim.take_loot(id) {
                tracing::debug!(?id, "duplicate loot report");
            }
            Vec::new()
        }

        // A follower reports a kill; the host validates existence, stamps
        // the authoritative time of death, and rebroadcasts.
        DiscreteEvent::UnitKilled { id, .. } => match sim.kill_unit(id, now_ms) {
            Some(stamped) => vec![HostReply::Broadcast(Message::Event(stamped))],
            None => {
                tracing::debug!(?id, "kill report for unknown unit");
                Vec::new()
            }
        },

        DiscreteEvent::CommandIssued { unit_ids, command } => {
            if let Some(slot) = roster.slot_of(from) {
                sim.issue_command(slot, &unit_ids, &command);
            }
            Vec::new()
        }

        DiscreteEvent::ActionLogged { action, .. } => {
            sim.record_action(action);
            Vec::new()
        }
    }
}

/// What a follower's driver should do after one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerOutcome {
    /// Nothing beyond the applied state.
    None,
    /// We were (re)assigned a slot — the join handshake completed.
    Assigned(u8),
    /// The roster changed.
    LobbyChanged,
    /// The world is running (snapshot seen or match started).
    WorldRunning,
    /// The lobby was full; the session is over before it began.
    Rejected,
}

/// Follower-side dispatch for one inbound message.
pub fn follower_handle_message(
    replica: &mut ReplicaWorld,
    msg: Message,
    now_ms: u64,
    corpse_decay_ms: u64,
) -> FollowerOutcome {
    match msg {
        Message::InitAssignment(init) => {
            replica.apply_init(&init);
            FollowerOutcome::Assigned(init.slot)
        }
        Message::LobbyState(lobby) => {
            replica.apply_lobby(&lobby);
            FollowerOutcome::LobbyChanged
        }
        Message::FullSync(snapshot) => {
            replica.apply_full(&snapshot);
            replica.sweep_corpses(now_ms, corpse_decay_ms);
            FollowerOutcome::WorldRunning
        }
        Message::DeltaSync(delta) => {
            replica.apply_delta(&delta);
            replica.sweep_corpses(now_ms, corpse_decay_ms);
            FollowerOutcome::None
        }
        Message::Event(event) => {
            replica.apply_event(&event);
            FollowerOutcome::None
        }
        Message::LobbyFull => FollowerOutcome::Rejected,
        Message::MatchStart => FollowerOutcome::WorldRunning,

        // Follower-to-host traffic arriving at a follower: tolerated.
        Message::RequestSlotSwitch(_) | Message::FollowerState(_) => {
            tracing::debug!("ignoring host-bound message at follower");
            FollowerOutcome::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::SimSettings;
    use crate::messages::{RequestSlotSwitch, UnitCommand};
    use glam::Vec3;
    use skirmish_net::RoomId;
    use skirmish_world::{BehaviorState, PlayerState, ReputationAction, UnitId};
    use std::time::Duration;

    fn setup() -> (HostSimulation, LobbyRoster, PeerId) {
        let mut sim = HostSimulation::new(
            4821,
            SimSettings {
                full_sync_interval: Duration::from_secs(3600),
                ..Default::default()
            },
        );
        let room = RoomId::parse("4821").unwrap();
        let mut roster = LobbyRoster::new(PeerId::host(&room));
        let follower = PeerId::for_connection(1, "127.0.0.1:51000".parse().unwrap());
        roster.claim_first_free(follower.clone());
        sim.populate(&roster.occupied_slots());
        (sim, roster, follower)
    }

    #[test]
    fn test_slot_switch_grants_and_rebroadcasts() {
        let (mut sim, mut roster, follower) = setup();

        let replies = host_handle_message(
            &mut sim,
            &mut roster,
            &follower,
            Message::RequestSlotSwitch(RequestSlotSwitch { target: 3 }),
            0,
        );
        assert_eq!(roster.slot_of(&follower), Some(3));
        assert!(matches!(
            replies.as_slice(),
            [HostReply::Broadcast(Message::LobbyState(state))] if state.slots[3].is_some()
        ));

        // Denied switch (slot 0 is the host's): no broadcast.
        let replies = host_handle_message(
            &mut sim,
            &mut roster,
            &follower,
            Message::RequestSlotSwitch(RequestSlotSwitch { target: 0 }),
            0,
        );
        assert!(replies.is_empty());
    }

    #[test]
    fn test_follower_state_lands_in_own_slot_only() {
        let (mut sim, mut roster, follower) = setup();

        // The follower claims to be slot 0 with a forged identity; the host
        // pins both to the session's actual seat.
        let mut forged = PlayerState::new("someone-else", 0);
        forged.position = Vec3::new(42.0, 0.0, 0.0);
        host_handle_message(
            &mut sim,
            &mut roster,
            &follower,
            Message::FollowerState(forged),
            0,
        );
        sim.tick(0.05, 1_000);

        let player = sim.players().next().unwrap();
        assert_eq!(player.slot, 1);
        assert_eq!(player.identity, follower.as_str());
        assert_eq!(player.position, Vec3::new(42.0, 0.0, 0.0));
    }

    #[test]
    fn test_unseated_peer_input_is_dropped() {
        let (mut sim, mut roster, _) = setup();
        let stranger = PeerId::for_connection(99, "127.0.0.1:52000".parse().unwrap());

        host_handle_message(
            &mut sim,
            &mut roster,
            &stranger,
            Message::FollowerState(PlayerState::new("x", 2)),
            0,
        );
        sim.tick(0.05, 1_000);
        assert_eq!(sim.players().count(), 0);
    }

    #[test]
    fn test_kill_report_is_validated_and_stamped() {
        let (mut sim, mut roster, follower) = setup();
        let victim = sim.agents()[0].id;

        let report = Message::Event(DiscreteEvent::UnitKilled {
            id: victim,
            position: Vec3::ZERO,
            color_tag: 0,
            time_of_death_ms: 12, // follower's guess is ignored
        });
        let replies = host_handle_message(&mut sim, &mut roster, &follower, report, 777_000);

        assert!(matches!(
            replies.as_slice(),
            [HostReply::Broadcast(Message::Event(DiscreteEvent::UnitKilled {
                id,
                time_of_death_ms: 777_000,
                ..
            }))] if *id == victim
        ));

        // A duplicate report finds nothing and stays silent.
        let dup = Message::Event(DiscreteEvent::UnitKilled {
            id: victim,
            position: Vec3::ZERO,
            color_tag: 0,
            time_of_death_ms: 12,
        });
        assert!(host_handle_message(&mut sim, &mut roster, &follower, dup, 778_000).is_empty());
    }

    #[test]
    fn test_command_relay_applies_to_own_units() {
        let (mut sim, mut roster, follower) = setup();
        let mine: Vec<UnitId> = sim
            .agents()
            .iter()
            .filter(|u| u.owner_slot == Some(1))
            .map(|u| u.id)
            .collect();

        host_handle_message(
            &mut sim,
            &mut roster,
            &follower,
            Message::Event(DiscreteEvent::CommandIssued {
                unit_ids: mine.clone(),
                command: UnitCommand::Hold,
            }),
            0,
        );

        for unit in sim.agents().iter().filter(|u| mine.contains(&u.id)) {
            assert_eq!(unit.state, BehaviorState::HoldPosition);
        }
    }

    #[test]
    fn test_action_logged_moves_reputation() {
        let (mut sim, mut roster, follower) = setup();
        host_handle_message(
            &mut sim,
            &mut roster,
            &follower,
            Message::Event(DiscreteEvent::ActionLogged {
                slot: 1,
                action: ReputationAction::Threaten,
            }),
            0,
        );
        assert_eq!(sim.reputation().citizen, -15);
    }

    #[test]
    fn test_host_ignores_follower_bound_messages() {
        let (mut sim, mut roster, follower) = setup();
        for msg in [Message::LobbyFull, Message::MatchStart] {
            assert!(host_handle_message(&mut sim, &mut roster, &follower, msg, 0).is_empty());
        }
    }

    #[test]
    fn test_follower_outcomes() {
        let mut replica = ReplicaWorld::new();
        let outcome = follower_handle_message(&mut replica, Message::MatchStart, 0, 1_000);
        assert_eq!(outcome, FollowerOutcome::WorldRunning);

        let outcome = follower_handle_message(&mut replica, Message::LobbyFull, 0, 1_000);
        assert_eq!(outcome, FollowerOutcome::Rejected);

        // Host-bound messages are tolerated noise at a follower.
        let outcome = follower_handle_message(
            &mut replica,
            Message::FollowerState(PlayerState::new("x", 0)),
            0,
            1_000,
        );
        assert_eq!(outcome, FollowerOutcome::None);
    }
}
