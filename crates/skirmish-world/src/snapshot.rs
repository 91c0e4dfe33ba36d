//! World snapshots: the full and delta encodings the host broadcasts.
//!
//! Deltas keep steady-state bandwidth low; any drop would drift forever, so
//! the host also emits an unconditional full snapshot on a watchdog interval
//! (and on every join). A run of deltas applied over a full snapshot must
//! equal the final full state — the delta is a valid incremental encoding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentState, UnitId};
use crate::corpse::CorpseEntity;
use crate::faction::Reputation;
use crate::loot::LootId;
use crate::player::PlayerState;

/// Complete world state at one host tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Host tick the snapshot was assembled at.
    pub tick: u64,
    /// In-game hour, 0..24.
    pub time_of_day: f32,
    /// Shared reputation counters.
    pub reputation: Reputation,
    /// Every participant's avatar state (receivers filter their own).
    pub players: Vec<PlayerState>,
    /// Every live agent unit.
    pub agents: Vec<AgentState>,
    /// Every corpse still decaying.
    pub corpses: Vec<CorpseEntity>,
    /// Caches already taken, for late joiners.
    pub looted: Vec<LootId>,
}

/// Changes since the previous broadcast.
///
/// Player states are small and move every tick, so they ride along whole;
/// agents are included only when dirty; corpses only when added. Shared
/// scalars always ride along (they are cheap and overwrite-safe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDelta {
    /// Host tick the delta was assembled at.
    pub tick: u64,
    /// In-game hour, 0..24.
    pub time_of_day: f32,
    /// Shared reputation counters.
    pub reputation: Reputation,
    /// All participant avatar states.
    pub players: Vec<PlayerState>,
    /// Agents changed since the previous broadcast.
    pub agents: Vec<AgentState>,
    /// Agents destroyed since the previous broadcast (deaths also arrive as
    /// UNIT_KILLED events; carrying the removal here keeps a pure delta
    /// stream convergent even if an event is never seen).
    pub agents_removed: Vec<UnitId>,
    /// Corpses created since the previous broadcast.
    pub corpses_added: Vec<CorpseEntity>,
    /// Caches taken since the previous broadcast.
    pub looted: Vec<LootId>,
}

/// Tracks agents changed since the last broadcast.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: HashSet<UnitId>,
}

impl DirtyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a unit as changed since the last broadcast.
    pub fn mark(&mut self, id: UnitId) {
        self.dirty.insert(id);
    }

    /// Whether a unit is currently marked.
    pub fn contains(&self, id: UnitId) -> bool {
        self.dirty.contains(&id)
    }

    /// Drain all marked units, resetting the set.
    pub fn drain(&mut self) -> HashSet<UnitId> {
        std::mem::take(&mut self.dirty)
    }

    /// Number of currently marked units.
    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    /// Whether nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }
}
