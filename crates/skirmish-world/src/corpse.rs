//! Transient corpse entities with deterministic decay.
//!
//! Host and followers run the identical expiry computation from the shared
//! `time_of_death_ms`, so corpses vanish consistently on every peer without
//! a removal message.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Two corpses within this many milliseconds of each other at apply time are
/// treated as the same kill (events and deltas can both carry a death).
pub const CORPSE_DEDUP_WINDOW_MS: u64 = 100;

/// A fallen unit awaiting decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpseEntity {
    /// Where the unit fell.
    pub position: Vec3,
    /// Color tag inherited from the unit.
    pub color_tag: u32,
    /// Host timestamp of death in milliseconds.
    pub time_of_death_ms: u64,
}

impl CorpseEntity {
    /// Deterministic expiry check: strictly after `time_of_death + decay`.
    pub fn is_expired(&self, now_ms: u64, decay_ms: u64) -> bool {
        now_ms.saturating_sub(self.time_of_death_ms) > decay_ms
    }
}

/// Cosmetic marker left where a corpse decayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomMarker {
    /// Where the corpse was.
    pub position: Vec3,
}

/// Remove expired corpses in place, returning the markers that replace them.
pub fn sweep_expired(
    corpses: &mut Vec<CorpseEntity>,
    now_ms: u64,
    decay_ms: u64,
) -> Vec<BloomMarker> {
    let mut markers = Vec::new();
    corpses.retain(|corpse| {
        if corpse.is_expired(now_ms, decay_ms) {
            markers.push(BloomMarker {
                position: corpse.position,
            });
            false
        } else {
            true
        }
    });
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpse_at(t: u64) -> CorpseEntity {
        CorpseEntity {
            position: Vec3::new(1.0, 0.0, 2.0),
            color_tag: 0xaa3333,
            time_of_death_ms: t,
        }
    }

    #[test]
    fn test_expiry_is_deterministic_across_peers() {
        // Host and follower compute expiry independently from the same
        // time_of_death; they must agree at every instant.
        let decay = 1_200_000;
        let corpse_host = corpse_at(50_000);
        let corpse_follower = corpse_at(50_000);

        for now in [50_000, 650_000, 1_250_000, 1_250_001, 2_000_000] {
            assert_eq!(
                corpse_host.is_expired(now, decay),
                corpse_follower.is_expired(now, decay),
                "divergence at now={now}"
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let decay = 1_000;
        let corpse = corpse_at(10_000);
        assert!(!corpse.is_expired(11_000, decay), "exactly at decay: alive");
        assert!(corpse.is_expired(11_001, decay), "past decay: expired");
    }

    #[test]
    fn test_clock_before_death_is_not_expired() {
        // A follower can apply a snapshot whose corpses die "in its future"
        // if clocks are skewed; saturating math keeps them alive.
        let corpse = corpse_at(10_000);
        assert!(!corpse.is_expired(5_000, 1_000));
    }

    #[test]
    fn test_sweep_replaces_with_markers() {
        let mut corpses = vec![corpse_at(0), corpse_at(500_000), corpse_at(900_000)];
        let markers = sweep_expired(&mut corpses, 1_200_001, 1_200_000);

        assert_eq!(markers.len(), 1, "only the oldest corpse expired");
        assert_eq!(corpses.len(), 2);
        assert_eq!(markers[0].position, Vec3::new(1.0, 0.0, 2.0));
    }
}
