//! The agent behavior state machine, advanced host-side once per tick per
//! unit.
//!
//! The machine is a pure function of the unit, a contact list (other units
//! and player avatars), the shared clock/reputation, and an injected RNG —
//! followers never run it, they only interpolate replicated results.

use glam::Vec3;
use rand::Rng;

use crate::agent::{AgentUnit, BehaviorState, Job, UnitId};
use crate::faction::{Faction, Reputation, is_hostile};
use crate::player::MAX_SLOTS;

/// Tuning knobs for the behavior machine. Defaults mirror the shipped game.
#[derive(Debug, Clone)]
pub struct BehaviorParams {
    /// Radius within which hostiles are noticed (meters).
    pub detection_radius: f32,
    /// Hour night starts (24h clock).
    pub night_start_hour: f32,
    /// Hour night ends.
    pub night_end_hour: f32,
    /// Radius around home unowned units wander inside (meters).
    pub wander_radius: f32,
    /// Arrival tolerance — closer than this counts as "there" (meters).
    pub arrival_tolerance: f32,
    /// A following unit re-approaches its owner beyond this distance.
    pub follow_distance: f32,
    /// Objective point for `ChargeTarget` orders.
    pub charge_point: Vec3,
    /// Base ranged-attack cooldown (ms).
    pub attack_cooldown_ms: u64,
    /// Uniform random extension of the cooldown (ms).
    pub attack_cooldown_spread_ms: u64,
    /// Per-tick chance an idle unit picks a fresh wander target.
    pub wander_repick_chance: f32,
    /// Medics heal units within this range (meters).
    pub medic_heal_range: f32,
    /// Medic heal rate (health per second).
    pub medic_heal_rate: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            detection_radius: 30.0,
            night_start_hour: 20.0,
            night_end_hour: 6.0,
            wander_radius: 20.0,
            arrival_tolerance: 0.5,
            follow_distance: 4.0,
            charge_point: Vec3::ZERO,
            attack_cooldown_ms: 1_500,
            attack_cooldown_spread_ms: 1_000,
            wander_repick_chance: 0.005,
            medic_heal_range: 5.0,
            medic_heal_rate: 10.0,
        }
    }
}

/// A potential target or heal recipient near a unit: another unit
/// (`id: Some`) or a player avatar (`id: None`).
#[derive(Debug, Clone)]
pub struct Contact {
    /// Unit id, `None` for player avatars.
    pub id: Option<UnitId>,
    /// Faction (player avatars are `Squad`).
    pub faction: Faction,
    /// World position.
    pub position: Vec3,
    /// Health, 0..=100.
    pub health: f32,
    /// Whether this contact is a player avatar.
    pub is_player: bool,
}

/// Per-tick inputs shared by every unit.
pub struct UnitTickCtx<'a> {
    /// Host clock in milliseconds.
    pub now_ms: u64,
    /// Seconds since the previous tick.
    pub dt: f32,
    /// In-game hour, 0..24.
    pub time_of_day: f32,
    /// Shared reputation counters.
    pub reputation: &'a Reputation,
    /// Every other unit and every player avatar.
    pub contacts: &'a [Contact],
    /// Player avatar position per slot, for `FollowOwner`.
    pub owner_positions: [Option<Vec3>; MAX_SLOTS],
    /// Tuning.
    pub params: &'a BehaviorParams,
}

/// Side effects a unit produced this tick, applied by the simulation after
/// the per-unit pass (never mutating other units mid-iteration).
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEffect {
    /// A ranged attack toward a point, replicated as a discrete event.
    RangedAttack {
        /// Firing unit.
        attacker: UnitId,
        /// Aim point.
        target: Vec3,
    },
    /// A medic heals another unit.
    Heal {
        /// Recipient unit.
        target: UnitId,
        /// Health restored this tick.
        amount: f32,
    },
}

/// Whether `hour` falls in the night window (the window wraps midnight).
pub fn is_night(hour: f32, start: f32, end: f32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

fn yaw_toward(from: Vec3, to: Vec3) -> f32 {
    (to.x - from.x).atan2(to.z - from.z)
}

/// Advance one unit by one tick. Returns `true` if the unit changed in a
/// way that must replicate (state, position, or facing).
pub fn advance_unit(
    unit: &mut AgentUnit,
    ctx: &UnitTickCtx,
    rng: &mut impl Rng,
    effects: &mut Vec<UnitEffect>,
) -> bool {
    let params = ctx.params;
    let mut changed = false;

    // Hostile scan: nearest live qualifying contact inside detection radius.
    let mut nearest: Option<(Vec3, f32)> = None;
    for contact in ctx.contacts {
        if contact.id == Some(unit.id) || contact.health <= 0.0 {
            continue;
        }
        if !is_hostile(
            unit.faction,
            contact.faction,
            contact.is_player,
            ctx.reputation,
        ) {
            continue;
        }
        let dist = unit.position.distance(contact.position);
        if dist < params.detection_radius && nearest.is_none_or(|(_, best)| dist < best) {
            nearest = Some((contact.position, dist));
        }
    }

    if let Some((hostile_pos, _)) = nearest {
        if unit.state != BehaviorState::Combat {
            unit.disposition = unit.state;
            unit.state = BehaviorState::Combat;
            changed = true;
        }
        let facing = yaw_toward(unit.position, hostile_pos);
        if (facing - unit.yaw).abs() > f32::EPSILON {
            unit.yaw = facing;
            changed = true;
        }
        // Ranged attack on a randomized cooldown; an effect, not a state.
        if ctx.now_ms >= unit.next_attack_ms {
            unit.next_attack_ms = ctx.now_ms
                + params.attack_cooldown_ms
                + rng.random_range(0..=params.attack_cooldown_spread_ms);
            effects.push(UnitEffect::RangedAttack {
                attacker: unit.id,
                target: hostile_pos,
            });
        }
    } else if unit.state == BehaviorState::Combat {
        unit.state = unit.disposition;
        changed = true;
    }

    // Medics patch up nearby wounded units.
    if unit.job == Job::Medic {
        for contact in ctx.contacts {
            let Some(target) = contact.id else { continue };
            if target == unit.id {
                continue;
            }
            if contact.faction != Faction::Raider
                && contact.health > 0.0
                && contact.health < 100.0
                && unit.position.distance(contact.position) < params.medic_heal_range
            {
                effects.push(UnitEffect::Heal {
                    target,
                    amount: params.medic_heal_rate * ctx.dt,
                });
            }
        }
    }

    // Movement target selection.
    let mut target: Option<Vec3> = None;
    let mut frozen = false;

    if unit.state == BehaviorState::Combat {
        // Stand and fight.
    } else if let Some(owner) = unit.owner_slot {
        match unit.state {
            BehaviorState::FollowOwner => {
                if let Some(owner_pos) = ctx.owner_positions[usize::from(owner) % MAX_SLOTS]
                    && unit.position.distance(owner_pos) > params.follow_distance
                {
                    target = Some(owner_pos);
                }
            }
            BehaviorState::ChargeTarget => target = Some(params.charge_point),
            BehaviorState::Moving => target = unit.nav_target,
            // HoldPosition and everything else: stand.
            _ => {}
        }
    } else {
        let night = is_night(ctx.time_of_day, params.night_start_hour, params.night_end_hour);
        if night && unit.faction != Faction::Guard {
            if unit.state != BehaviorState::Sleep {
                unit.state = BehaviorState::Sleep;
                unit.disposition = BehaviorState::Sleep;
                unit.nav_target = None;
                changed = true;
            }
            if unit.position.distance(unit.home) > params.arrival_tolerance {
                target = Some(unit.home);
            } else {
                frozen = true;
            }
        } else {
            if unit.state == BehaviorState::Sleep {
                unit.state = BehaviorState::Idle;
                unit.disposition = BehaviorState::Idle;
                changed = true;
            }
            match unit.state {
                BehaviorState::PatrolHome => {
                    if unit.position.distance(unit.home) > params.arrival_tolerance {
                        target = Some(unit.home);
                    } else {
                        unit.state = BehaviorState::Idle;
                        changed = true;
                    }
                }
                BehaviorState::Idle => {
                    if unit.position.distance(unit.home) > params.wander_radius {
                        unit.state = BehaviorState::PatrolHome;
                        unit.nav_target = None;
                        changed = true;
                        target = Some(unit.home);
                    } else {
                        if unit.nav_target.is_none()
                            || rng.random_range(0.0..1.0f32) < params.wander_repick_chance
                        {
                            let half = params.wander_radius / 2.0;
                            unit.nav_target = Some(
                                unit.home
                                    + Vec3::new(
                                        rng.random_range(-half..half),
                                        0.0,
                                        rng.random_range(-half..half),
                                    ),
                            );
                        }
                        target = unit.nav_target;
                    }
                }
                BehaviorState::Moving => target = unit.nav_target,
                _ => {}
            }
        }
    }

    // Movement integration with arrival tolerance.
    if let Some(goal) = target
        && !frozen
    {
        let offset = goal - unit.position;
        let dist = offset.length();
        if dist > params.arrival_tolerance {
            let step = (unit.move_speed * ctx.dt).min(dist);
            unit.yaw = yaw_toward(unit.position, goal);
            unit.position += offset.normalize() * step;
            changed = true;
        } else {
            unit.nav_target = None;
        }
    }

    changed
}
