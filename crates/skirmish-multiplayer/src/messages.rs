//! The replication protocol: a closed, tagged message set.
//!
//! Every message is one variant of [`Message`], serialized with [`postcard`]
//! behind a protocol version byte. Dispatch sites match exhaustively; a
//! payload that fails to decode (unknown version, unknown variant from a
//! newer build, torn bytes) is dropped and logged rather than crashing the
//! receive path.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use skirmish_world::{
    LootId, MAX_SLOTS, PlayerState, Reputation, ReputationAction, UnitId, WorldDelta,
    WorldSnapshot,
};

/// Current wire-protocol version. Prepended to every serialized message.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level replication message. The enum discriminant is the type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Message {
    // --- Lobby negotiation ---
    /// Host → joining follower, once: your slot, the world seed, and the
    /// shared counters.
    InitAssignment(InitAssignment),
    /// Host → all: the current roster. Idempotent, safe to apply repeatedly.
    LobbyState(LobbyState),
    /// Follower → host: request to move to an empty slot.
    RequestSlotSwitch(RequestSlotSwitch),
    /// Host → rejected joiner when all four slots are taken.
    LobbyFull,
    /// Host → all: leave the lobby, the match begins.
    MatchStart,

    // --- Steady state ---
    /// Follower → host, every input tick: the follower's own avatar state.
    FollowerState(PlayerState),
    /// Host → one or all: complete world snapshot (join + watchdog).
    FullSync(WorldSnapshot),
    /// Host → all: entities changed since the last broadcast.
    DeltaSync(WorldDelta),
    /// Either direction: fire-and-forget discrete event.
    Event(DiscreteEvent),
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// One-time join assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitAssignment {
    /// Assigned lobby slot.
    pub slot: u8,
    /// Transport identity the host minted for this follower; the follower
    /// stamps it on every `FollowerState` it sends.
    pub identity: String,
    /// Seed the follower regenerates the static world from.
    pub world_seed: u64,
    /// Shared reputation counters at join time.
    pub reputation: Reputation,
    /// In-game hour at join time.
    pub time_of_day: f32,
}

/// Roster broadcast: identity per slot, `None` for empty seats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LobbyState {
    /// Slot → identity.
    pub slots: [Option<String>; MAX_SLOTS],
}

/// Follower request to claim an empty slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RequestSlotSwitch {
    /// Desired slot index.
    pub target: u8,
}

/// An order or effect applied to agent units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UnitCommand {
    /// Path to a point.
    Move(Vec3),
    /// Shadow the owning player.
    Follow,
    /// Advance on the objective.
    Charge,
    /// Hold position.
    Hold,
    /// Ranged-attack effect toward a point (host-emitted, cosmetic on
    /// followers).
    Attack(Vec3),
}

/// Fire-and-forget events. Receivers check existence before acting, so a
/// duplicate or late event is harmless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DiscreteEvent {
    /// A supply cache was taken.
    LootTaken {
        /// Which cache.
        id: LootId,
    },
    /// A unit died and became a corpse.
    UnitKilled {
        /// Which unit.
        id: UnitId,
        /// Where it fell.
        position: Vec3,
        /// Corpse color tag.
        color_tag: u32,
        /// Host timestamp of death (ms), the shared decay anchor.
        time_of_death_ms: u64,
    },
    /// An order for owned units (follower → host), or a replicated
    /// ranged-attack effect (host → all).
    CommandIssued {
        /// Affected units.
        unit_ids: Vec<UnitId>,
        /// The order or effect.
        command: UnitCommand,
    },
    /// A reputation-moving player action, applied host-side.
    ActionLogged {
        /// Acting participant's slot.
        slot: u8,
        /// What they did.
        action: ReputationAction,
    },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during message deserialization.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload was empty — no version byte.
    #[error("empty payload, no version byte")]
    EmptyPayload,

    /// The version byte does not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Postcard deserialization failed.
    #[error("deserialization error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serialize a [`Message`] into a versioned binary payload.
///
/// Wire format: `[version: u8] [postcard-encoded Message]`
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>, postcard::Error> {
    let body = postcard::to_allocvec(msg)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a versioned binary payload into a [`Message`].
pub fn deserialize_message(data: &[u8]) -> Result<Message, MessageError> {
    if data.is_empty() {
        return Err(MessageError::EmptyPayload);
    }

    let version = data[0];
    if version != PROTOCOL_VERSION {
        return Err(MessageError::UnsupportedVersion(version));
    }

    Ok(postcard::from_bytes(&data[1..])?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_world::Stance;

    fn sample_player(identity: &str, slot: u8) -> PlayerState {
        let mut p = PlayerState::new(identity, slot);
        p.position = Vec3::new(10.0, 1.6, -4.0);
        p.yaw = 1.25;
        p.stance = Stance::Crouched;
        p.lean = 0.4;
        p.last_action_ms = 99_000;
        p.last_action_target = Some(Vec3::new(0.0, 1.0, 50.0));
        p
    }

    #[test]
    fn test_init_assignment_roundtrip() {
        let msg = Message::InitAssignment(InitAssignment {
            slot: 2,
            identity: "peer3@10.0.0.2:51000".to_string(),
            world_seed: 4821,
            reputation: Reputation::default(),
            time_of_day: 12.5,
        });
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_lobby_state_roundtrip() {
        let msg = Message::LobbyState(LobbyState {
            slots: [
                Some("4821-host".to_string()),
                Some("peer1@10.0.0.2:50000".to_string()),
                None,
                None,
            ],
        });
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_follower_state_roundtrip() {
        let msg = Message::FollowerState(sample_player("peer1@10.0.0.2:50000", 1));
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_event_roundtrips() {
        let events = vec![
            DiscreteEvent::LootTaken { id: LootId(5003) },
            DiscreteEvent::UnitKilled {
                id: UnitId(1004),
                position: Vec3::new(3.0, 0.0, -9.0),
                color_tag: 0xaa3333,
                time_of_death_ms: 1_000_000,
            },
            DiscreteEvent::CommandIssued {
                unit_ids: vec![UnitId(0), UnitId(1)],
                command: UnitCommand::Move(Vec3::new(25.0, 0.0, 25.0)),
            },
            DiscreteEvent::ActionLogged {
                slot: 3,
                action: ReputationAction::Threaten,
            },
        ];
        for event in events {
            let msg = Message::Event(event);
            let bytes = serialize_message(&msg).unwrap();
            assert_eq!(deserialize_message(&bytes).unwrap(), msg);

            // Generic serde round-trip, not just postcard.
            let json = serde_json::to_string(&msg).unwrap();
            let from_json: Message = serde_json::from_str(&json).unwrap();
            assert_eq!(from_json, msg);
        }
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = serialize_message(&Message::MatchStart).unwrap();
        bytes[0] = 200;
        assert!(matches!(
            deserialize_message(&bytes),
            Err(MessageError::UnsupportedVersion(200))
        ));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(
            deserialize_message(&[]),
            Err(MessageError::EmptyPayload)
        ));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let result = deserialize_message(&[PROTOCOL_VERSION, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err(), "torn payload must fail, not panic");
    }

    #[test]
    fn test_steady_state_messages_are_compact() {
        let msg = Message::FollowerState(sample_player("p", 1));
        let bytes = serialize_message(&msg).unwrap();
        assert!(
            bytes.len() < 128,
            "per-tick input packet should stay small, got {} bytes",
            bytes.len()
        );
    }
}
