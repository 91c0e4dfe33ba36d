//! Seeded world population.
//!
//! Agent units and supply caches are placed from the shared world seed, so
//! the host and every follower that receives the seed lay out the same
//! world. Squad units spawn in blocks of four per occupied lobby slot at
//! fixed muster points around the village center.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::{AgentUnit, Job, UnitId};
use crate::faction::Faction;
use crate::loot::{LootCache, LootId};

/// Squad muster offsets: four positions per slot, ringed around the center.
const SQUAD_OFFSETS: [[f32; 2]; 16] = [
    [2.0, 12.0], [-2.0, 12.0], [2.0, 14.0], [-2.0, 14.0],
    [2.0, -12.0], [-2.0, -12.0], [2.0, -14.0], [-2.0, -14.0],
    [12.0, 2.0], [12.0, -2.0], [14.0, 2.0], [14.0, -2.0],
    [-12.0, 2.0], [-12.0, -2.0], [-14.0, 2.0], [-14.0, -2.0],
];

/// Units per lobby slot.
pub const UNITS_PER_SLOT: usize = 4;

/// Ambient NPC ids start here; squad unit ids are the offset index.
const NPC_ID_BASE: u64 = 1000;

/// Supply cache ids start here.
const LOOT_ID_BASE: u64 = 5000;

fn ring_position(rng: &mut StdRng, min_r: f32, spread: f32) -> Vec3 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    let radius = min_r + rng.random_range(0.0..spread);
    Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
}

/// Build the session's agent units and supply caches from the world seed.
///
/// `occupied_slots` selects which squad blocks spawn — one block of
/// [`UNITS_PER_SLOT`] units per occupied slot, owned by that slot.
pub fn populate(seed: u64, occupied_slots: &[u8]) -> (Vec<AgentUnit>, Vec<LootCache>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut units = Vec::new();

    // Owned squad units at fixed muster points.
    for (idx, [x, z]) in SQUAD_OFFSETS.iter().enumerate() {
        let slot = (idx / UNITS_PER_SLOT) as u8;
        if !occupied_slots.contains(&slot) {
            continue;
        }
        let mut unit = AgentUnit::spawn(
            UnitId(idx as u64),
            Faction::Squad,
            Vec3::new(*x, 0.0, *z),
            Some(slot),
        );
        unit.state = crate::agent::BehaviorState::HoldPosition;
        unit.disposition = crate::agent::BehaviorState::HoldPosition;
        units.push(unit);
    }

    let mut next_id = NPC_ID_BASE;
    let mut spawn_npc = |units: &mut Vec<AgentUnit>,
                         rng: &mut StdRng,
                         faction: Faction,
                         job: Job,
                         min_r: f32,
                         spread: f32| {
        let mut unit = AgentUnit::spawn(UnitId(next_id), faction, ring_position(rng, min_r, spread), None);
        unit.job = job;
        next_id += 1;
        units.push(unit);
    };

    // Village population, mirroring the shipped zone layout: medics and
    // smiths near the center, a guard ring, traders on the outskirts,
    // raider camps in the wilderness.
    for _ in 0..3 {
        spawn_npc(&mut units, &mut rng, Faction::Citizen, Job::Medic, 0.0, 5.0);
    }
    for _ in 0..3 {
        spawn_npc(&mut units, &mut rng, Faction::Citizen, Job::Smith, 0.0, 5.0);
    }
    for _ in 0..8 {
        spawn_npc(&mut units, &mut rng, Faction::Guard, Job::Guard, 20.0, 10.0);
    }
    for _ in 0..5 {
        spawn_npc(&mut units, &mut rng, Faction::Trader, Job::None, 45.0, 30.0);
    }
    for _ in 0..15 {
        spawn_npc(&mut units, &mut rng, Faction::Raider, Job::None, 85.0, 40.0);
    }

    // Supply caches in the mid ring.
    let loot: Vec<LootCache> = (0..10)
        .map(|i| {
            LootCache::new(
                LootId(LOOT_ID_BASE + i),
                ring_position(&mut rng, 30.0, 60.0),
            )
        })
        .collect();

    tracing::debug!(
        units = units.len(),
        caches = loot.len(),
        "population rolled from seed {seed}"
    );
    (units, loot)
}
