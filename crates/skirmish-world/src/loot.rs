//! Supply caches scattered by world population.
//!
//! Positions come from the shared seed, so every peer spawns the same
//! caches; only the taken/available flag replicates (LOOT_TAKEN events plus
//! the taken-id set in snapshots for late joiners).

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Identifier of a seeded supply cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootId(pub u64);

/// A supply cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootCache {
    /// Cache identifier, stable for the session.
    pub id: LootId,
    /// Seeded world position.
    pub position: Vec3,
    /// Whether some participant already took it.
    pub taken: bool,
}

impl LootCache {
    /// A fresh, untaken cache.
    pub fn new(id: LootId, position: Vec3) -> Self {
        Self {
            id,
            position,
            taken: false,
        }
    }
}
