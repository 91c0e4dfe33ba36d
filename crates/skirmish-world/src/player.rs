//! Per-participant avatar state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Number of lobby slots per room. Slot 0 is always the host.
pub const MAX_SLOTS: usize = 4;

/// Avatar stance, replicated for third-person posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    /// Upright.
    Standing,
    /// Crouched.
    Crouched,
}

/// One participant's avatar state.
///
/// Owned and written only by the participant it represents; everyone else
/// holds a read-only replica. A follower must never apply an inbound copy
/// of its *own* state — the replica layer filters by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Transport identity of the owning participant.
    pub identity: String,
    /// Lobby slot of the owning participant.
    pub slot: u8,
    /// World position.
    pub position: Vec3,
    /// Facing yaw in radians.
    pub yaw: f32,
    /// Stance.
    pub stance: Stance,
    /// Lean factor, -1 (full left) to 1 (full right).
    pub lean: f32,
    /// Timestamp of the last fired action (ms). Monotonic per player; a
    /// replica replays the action effect when it sees this advance.
    pub last_action_ms: u64,
    /// Aim point of the last fired action, if any.
    pub last_action_target: Option<Vec3>,
}

impl PlayerState {
    /// A neutral state for a freshly assigned participant.
    pub fn new(identity: impl Into<String>, slot: u8) -> Self {
        Self {
            identity: identity.into(),
            slot,
            position: Vec3::ZERO,
            yaw: 0.0,
            stance: Stance::Standing,
            lean: 0.0,
            last_action_ms: 0,
            last_action_target: None,
        }
    }
}
