//! The follower's eventually-consistent world replica.
//!
//! Inbound snapshots either replace state wholesale (`FULL_SYNC`) or patch
//! per-entity entries (`DELTA_SYNC`); each message applies atomically and
//! the replica never simulates — the behavior machine is host-only. The one
//! hard rule: a follower never accepts a replicated copy of its *own*
//! avatar state.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use skirmish_world::corpse::CORPSE_DEDUP_WINDOW_MS;
use skirmish_world::{
    AgentState, BloomMarker, CorpseEntity, LootId, MAX_SLOTS, PlayerState, Reputation, UnitId,
    WorldDelta, WorldSnapshot, sweep_expired,
};

use crate::messages::{DiscreteEvent, InitAssignment, LobbyState, UnitCommand};

/// Read-only shadow of the host's world.
#[derive(Debug, Clone, Default)]
pub struct ReplicaWorld {
    /// Identity the host minted for this follower (from `INIT_ASSIGNMENT`).
    pub identity: String,
    /// This follower's lobby slot.
    pub slot: Option<u8>,
    /// Seed for regenerating the static world.
    pub world_seed: u64,
    /// Host tick of the newest applied snapshot.
    pub tick: u64,
    /// In-game hour.
    pub time_of_day: f32,
    /// Shared reputation counters.
    pub reputation: Reputation,
    /// Roster as last broadcast.
    pub roster: [Option<String>; MAX_SLOTS],
    /// Other participants' avatars, by identity.
    pub players: HashMap<String, PlayerState>,
    /// Agent unit shadows, by id.
    pub agents: HashMap<UnitId, AgentState>,
    /// Decaying corpses.
    pub corpses: Vec<CorpseEntity>,
    /// Markers left by decayed corpses.
    pub blooms: Vec<BloomMarker>,
    /// Caches known to be taken.
    pub looted: HashSet<LootId>,
    /// Replicated ranged-attack effects awaiting the renderer.
    attack_flashes: Vec<(UnitId, Vec3)>,
}

impl ReplicaWorld {
    /// Empty replica, waiting for an assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// One-time join assignment.
    pub fn apply_init(&mut self, init: &InitAssignment) {
        self.identity = init.identity.clone();
        self.slot = Some(init.slot);
        self.world_seed = init.world_seed;
        self.reputation = init.reputation;
        self.time_of_day = init.time_of_day;
        tracing::info!(slot = init.slot, "assigned to lobby as {}", self.identity);
    }

    /// Roster broadcast. Recomputes our slot and prunes avatar shadows of
    /// departed participants. Idempotent.
    pub fn apply_lobby(&mut self, lobby: &LobbyState) {
        self.roster = lobby.slots.clone();
        self.slot = self
            .roster
            .iter()
            .position(|s| s.as_deref() == Some(self.identity.as_str()))
            .map(|i| i as u8);
        self.players
            .retain(|identity, _| lobby.slots.iter().flatten().any(|s| s == identity));
    }

    /// Wholesale replacement from a full snapshot.
    pub fn apply_full(&mut self, snapshot: &WorldSnapshot) {
        self.tick = snapshot.tick;
        self.time_of_day = snapshot.time_of_day;
        self.reputation = snapshot.reputation;
        self.players = snapshot
            .players
            .iter()
            .filter(|p| p.identity != self.identity)
            .map(|p| (p.identity.clone(), p.clone()))
            .collect();
        self.agents = snapshot.agents.iter().map(|a| (a.id, a.clone())).collect();
        self.corpses = snapshot.corpses.clone();
        self.looted = snapshot.looted.iter().copied().collect();
    }

    /// Per-entity patch from a delta.
    pub fn apply_delta(&mut self, delta: &WorldDelta) {
        self.tick = delta.tick;
        self.time_of_day = delta.time_of_day;
        self.reputation = delta.reputation;
        // Deltas carry every avatar, so players replace wholesale too.
        self.players = delta
            .players
            .iter()
            .filter(|p| p.identity != self.identity)
            .map(|p| (p.identity.clone(), p.clone()))
            .collect();
        for agent in &delta.agents {
            self.agents.insert(agent.id, agent.clone());
        }
        for id in &delta.agents_removed {
            self.agents.remove(id);
        }
        for corpse in &delta.corpses_added {
            self.add_corpse_if_new(corpse.clone());
        }
        self.looted.extend(delta.looted.iter().copied());
    }

    /// Fire-and-forget event. Existence checks make duplicates harmless.
    pub fn apply_event(&mut self, event: &DiscreteEvent) {
        match event {
            DiscreteEvent::LootTaken { id } => {
                self.looted.insert(*id);
            }
            DiscreteEvent::UnitKilled {
                id,
                position,
                color_tag,
                time_of_death_ms,
            } => {
                self.agents.remove(id);
                self.add_corpse_if_new(CorpseEntity {
                    position: *position,
                    color_tag: *color_tag,
                    time_of_death_ms: *time_of_death_ms,
                });
            }
            DiscreteEvent::CommandIssued { unit_ids, command } => {
                // Orders are follower→host; the only host→follower command
                // is the cosmetic ranged-attack effect.
                if let UnitCommand::Attack(target) = command {
                    for id in unit_ids {
                        self.attack_flashes.push((*id, *target));
                    }
                }
            }
            // Reputation moves host-side; the counters arrive via snapshots.
            DiscreteEvent::ActionLogged { .. } => {}
        }
    }

    /// Run the same deterministic corpse sweep the host runs.
    pub fn sweep_corpses(&mut self, now_ms: u64, decay_ms: u64) {
        let markers = sweep_expired(&mut self.corpses, now_ms, decay_ms);
        self.blooms.extend(markers);
    }

    /// Drain pending ranged-attack effects for the renderer.
    pub fn take_attack_flashes(&mut self) -> Vec<(UnitId, Vec3)> {
        std::mem::take(&mut self.attack_flashes)
    }

    fn add_corpse_if_new(&mut self, corpse: CorpseEntity) {
        let duplicate = self.corpses.iter().any(|c| {
            c.position == corpse.position
                && c.time_of_death_ms.abs_diff(corpse.time_of_death_ms) < CORPSE_DEDUP_WINDOW_MS
        });
        if !duplicate {
            self.corpses.push(corpse);
        }
    }
}
