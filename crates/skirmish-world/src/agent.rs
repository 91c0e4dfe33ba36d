//! Host-simulated agent units and their replicated projection.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::faction::Faction;

/// Unique identifier for an agent unit within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Behavior disposition of a unit, evaluated host-side every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Default: stand around, wander near home.
    Idle,
    /// Moving to an explicit order target.
    Moving,
    /// Returning to home position after straying.
    PatrolHome,
    /// Shadowing the owning player.
    FollowOwner,
    /// Advancing on the fixed objective point.
    ChargeTarget,
    /// Holding position, no movement target.
    HoldPosition,
    /// Engaging a hostile within detection radius.
    Combat,
    /// Asleep at (or heading to) home during night hours.
    Sleep,
}

/// Civilian occupation, used by ambient behaviors (medics heal nearby
/// wounded units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    /// No occupation.
    None,
    /// Heals nearby damaged non-raider units.
    Medic,
    /// Smith (flavor only).
    Smith,
    /// Guard duty.
    Guard,
}

/// Canonical agent unit. Exists only on the host; followers hold the
/// [`AgentState`] projection replicated through snapshots.
#[derive(Debug, Clone)]
pub struct AgentUnit {
    /// Session-unique identifier.
    pub id: UnitId,
    /// Faction, fixed at spawn.
    pub faction: Faction,
    /// World position.
    pub position: Vec3,
    /// Facing yaw in radians.
    pub yaw: f32,
    /// Health, 0..=100. At 0 the unit converts into a corpse.
    pub health: f32,
    /// Current behavior state.
    pub state: BehaviorState,
    /// Non-combat state to return to when combat ends.
    pub disposition: BehaviorState,
    /// Owning player slot; `None` for ambient units.
    pub owner_slot: Option<u8>,
    /// Spawn anchor the unit wanders around and sleeps at.
    pub home: Vec3,
    /// Current movement target, if any.
    pub nav_target: Option<Vec3>,
    /// Movement speed in meters per second.
    pub move_speed: f32,
    /// Occupation.
    pub job: Job,
    /// Earliest timestamp (ms) the unit may fire again while in combat.
    pub next_attack_ms: u64,
    /// Cosmetic color tag, carried onto the corpse on death.
    pub color_tag: u32,
}

impl AgentUnit {
    /// Spawn a unit at `home` with faction defaults.
    pub fn spawn(id: UnitId, faction: Faction, home: Vec3, owner_slot: Option<u8>) -> Self {
        let move_speed = match faction {
            Faction::Squad => 6.0,
            Faction::Raider | Faction::Guard => 5.0,
            Faction::Citizen | Faction::Trader => 3.0,
        };
        Self {
            id,
            faction,
            position: home,
            yaw: 0.0,
            health: 100.0,
            state: BehaviorState::Idle,
            disposition: BehaviorState::Idle,
            owner_slot,
            home,
            nav_target: None,
            move_speed,
            job: Job::None,
            next_attack_ms: 0,
            color_tag: default_color(faction),
        }
    }

    /// Whether the unit is dead and should convert into a corpse.
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

fn default_color(faction: Faction) -> u32 {
    match faction {
        Faction::Squad => 0x22aa22,
        Faction::Citizen => 0xffffff,
        Faction::Trader => 0x55aa55,
        Faction::Guard => 0x0000aa,
        Faction::Raider => 0xaa3333,
    }
}

/// Replicated projection of an [`AgentUnit`]: what followers see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Session-unique identifier.
    pub id: UnitId,
    /// Faction.
    pub faction: Faction,
    /// World position.
    pub position: Vec3,
    /// Facing yaw in radians.
    pub yaw: f32,
    /// Health, 0..=100.
    pub health: f32,
    /// Behavior state, used for animation hints on the replica.
    pub state: BehaviorState,
    /// Owning player slot, if any.
    pub owner_slot: Option<u8>,
    /// Cosmetic color tag.
    pub color_tag: u32,
}

impl From<&AgentUnit> for AgentState {
    fn from(unit: &AgentUnit) -> Self {
        Self {
            id: unit.id,
            faction: unit.faction,
            position: unit.position,
            yaw: unit.yaw,
            health: unit.health,
            state: unit.state,
            owner_slot: unit.owner_slot,
            color_tag: unit.color_tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_speeds() {
        let home = Vec3::ZERO;
        assert_eq!(
            AgentUnit::spawn(UnitId(1), Faction::Squad, home, Some(0)).move_speed,
            6.0
        );
        assert_eq!(
            AgentUnit::spawn(UnitId(2), Faction::Raider, home, None).move_speed,
            5.0
        );
        assert_eq!(
            AgentUnit::spawn(UnitId(3), Faction::Citizen, home, None).move_speed,
            3.0
        );
    }

    #[test]
    fn test_projection_matches_unit() {
        let mut unit = AgentUnit::spawn(UnitId(7), Faction::Guard, Vec3::new(3.0, 0.0, -2.0), None);
        unit.health = 40.0;
        unit.state = BehaviorState::Combat;

        let state = AgentState::from(&unit);
        assert_eq!(state.id, UnitId(7));
        assert_eq!(state.position, unit.position);
        assert_eq!(state.health, 40.0);
        assert_eq!(state.state, BehaviorState::Combat);
        assert_eq!(state.owner_slot, None);
    }
}
