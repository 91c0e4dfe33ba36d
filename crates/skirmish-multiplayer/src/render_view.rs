//! The sole API surface exposed to the visual layer: a read-only map of
//! entity → interpolated transform + animation hint.
//!
//! Authoritative positions arrive at the network rate; the renderer runs
//! much faster. Each render frame the view lerps the visual transform
//! toward the latest replicated value (coefficient ≈0.15), which hides the
//! stepping without any client-side simulation.

use std::collections::HashMap;

use glam::Vec3;

use skirmish_world::{BehaviorState, Stance, UnitId};

use crate::replica::ReplicaWorld;

/// Identifies a rendered entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// A remote participant's avatar, by identity.
    Player(String),
    /// An agent unit.
    Unit(UnitId),
}

/// Coarse animation cue for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationHint {
    /// Standing around.
    Idle,
    /// Covering ground.
    Walking,
    /// Lying at home during night hours.
    Sleeping,
    /// Engaging a target.
    Combat,
    /// Crouched avatar.
    Crouched,
}

/// One entity's renderable state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity {
    /// Smoothed world position.
    pub position: Vec3,
    /// Smoothed facing yaw in radians.
    pub yaw: f32,
    /// Animation cue.
    pub hint: AnimationHint,
}

#[derive(Debug, Clone)]
struct Smoothed {
    position: Vec3,
    yaw: f32,
    target_position: Vec3,
    target_yaw: f32,
    hint: AnimationHint,
}

/// Movement below this distance renders as standing still.
const WALK_EPSILON: f32 = 0.1;

/// Interpolating view over a [`ReplicaWorld`], decoupled from the network
/// tick rate.
pub struct RenderView {
    alpha: f32,
    entities: HashMap<EntityKey, Smoothed>,
}

impl Default for RenderView {
    fn default() -> Self {
        Self::new(0.15)
    }
}

impl RenderView {
    /// View with the given per-frame lerp coefficient (clamped to a sane
    /// smoothing range).
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.05, 1.0),
            entities: HashMap::new(),
        }
    }

    /// Adopt the latest replicated targets. New entities snap straight to
    /// their authoritative transform; departed entities disappear.
    pub fn retarget(&mut self, replica: &ReplicaWorld) {
        let mut live: HashMap<EntityKey, (Vec3, f32, AnimationHint)> = HashMap::new();

        for player in replica.players.values() {
            let hint = match player.stance {
                Stance::Crouched => AnimationHint::Crouched,
                Stance::Standing => AnimationHint::Idle,
            };
            live.insert(
                EntityKey::Player(player.identity.clone()),
                (player.position, player.yaw, hint),
            );
        }
        for (id, agent) in &replica.agents {
            let hint = match agent.state {
                BehaviorState::Sleep => AnimationHint::Sleeping,
                BehaviorState::Combat => AnimationHint::Combat,
                _ => AnimationHint::Idle,
            };
            live.insert(EntityKey::Unit(*id), (agent.position, agent.yaw, hint));
        }

        self.entities.retain(|key, _| live.contains_key(key));
        for (key, (position, yaw, hint)) in live {
            match self.entities.get_mut(&key) {
                Some(entry) => {
                    entry.target_position = position;
                    entry.target_yaw = yaw;
                    entry.hint = hint;
                }
                None => {
                    self.entities.insert(
                        key,
                        Smoothed {
                            position,
                            yaw,
                            target_position: position,
                            target_yaw: yaw,
                            hint,
                        },
                    );
                }
            }
        }
    }

    /// Advance one render frame: lerp every visual transform toward its
    /// authoritative target. Yaw takes the short way around.
    pub fn advance(&mut self) {
        for entry in self.entities.values_mut() {
            entry.position = entry.position.lerp(entry.target_position, self.alpha);
            let delta = (entry.target_yaw - entry.yaw).sin().atan2((entry.target_yaw - entry.yaw).cos());
            entry.yaw += delta * self.alpha;
        }
    }

    /// The read-only render map. Entities still gliding toward a moved
    /// target report [`AnimationHint::Walking`] unless a stronger hint
    /// (combat, sleep, crouch) applies.
    pub fn entities(&self) -> HashMap<EntityKey, RenderEntity> {
        self.entities
            .iter()
            .map(|(key, entry)| {
                let moving = entry.position.distance(entry.target_position) > WALK_EPSILON;
                let hint = if moving && entry.hint == AnimationHint::Idle {
                    AnimationHint::Walking
                } else {
                    entry.hint
                };
                (
                    key.clone(),
                    RenderEntity {
                        position: entry.position,
                        yaw: entry.yaw,
                        hint,
                    },
                )
            })
            .collect()
    }

    /// Number of rendered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_world::{AgentState, Faction, PlayerState};

    fn replica_with_unit(position: Vec3, state: BehaviorState) -> ReplicaWorld {
        let mut replica = ReplicaWorld::new();
        replica.agents.insert(
            UnitId(1),
            AgentState {
                id: UnitId(1),
                faction: Faction::Raider,
                position,
                yaw: 0.0,
                health: 100.0,
                state,
                owner_slot: None,
                color_tag: 0xaa3333,
            },
        );
        replica
    }

    #[test]
    fn test_new_entity_snaps_to_target() {
        let mut view = RenderView::default();
        view.retarget(&replica_with_unit(Vec3::new(10.0, 0.0, 5.0), BehaviorState::Idle));

        let entities = view.entities();
        let entity = &entities[&EntityKey::Unit(UnitId(1))];
        assert_eq!(entity.position, Vec3::new(10.0, 0.0, 5.0));
        assert_eq!(entity.hint, AnimationHint::Idle, "no glide on first sight");
    }

    #[test]
    fn test_visual_position_converges_on_target() {
        let mut view = RenderView::new(0.15);
        view.retarget(&replica_with_unit(Vec3::ZERO, BehaviorState::Idle));
        view.retarget(&replica_with_unit(Vec3::new(10.0, 0.0, 0.0), BehaviorState::Idle));

        let mut last_distance = f32::MAX;
        for _ in 0..60 {
            view.advance();
            let d = view.entities()[&EntityKey::Unit(UnitId(1))]
                .position
                .distance(Vec3::new(10.0, 0.0, 0.0));
            assert!(d < last_distance, "each frame must close the gap");
            last_distance = d;
        }
        assert!(last_distance < 0.05, "converged, got {last_distance}");
    }

    #[test]
    fn test_gliding_entity_reads_as_walking() {
        let mut view = RenderView::new(0.15);
        view.retarget(&replica_with_unit(Vec3::ZERO, BehaviorState::Idle));
        view.retarget(&replica_with_unit(Vec3::new(8.0, 0.0, 0.0), BehaviorState::Idle));
        view.advance();

        let entities = view.entities();
        assert_eq!(entities[&EntityKey::Unit(UnitId(1))].hint, AnimationHint::Walking);
    }

    #[test]
    fn test_state_hints_override_movement() {
        let mut view = RenderView::new(0.15);
        view.retarget(&replica_with_unit(Vec3::ZERO, BehaviorState::Sleep));
        view.retarget(&replica_with_unit(Vec3::new(8.0, 0.0, 0.0), BehaviorState::Sleep));
        view.advance();
        assert_eq!(
            view.entities()[&EntityKey::Unit(UnitId(1))].hint,
            AnimationHint::Sleeping
        );

        view.retarget(&replica_with_unit(Vec3::new(8.0, 0.0, 0.0), BehaviorState::Combat));
        assert_eq!(
            view.entities()[&EntityKey::Unit(UnitId(1))].hint,
            AnimationHint::Combat
        );
    }

    #[test]
    fn test_departed_entities_disappear() {
        let mut view = RenderView::default();
        view.retarget(&replica_with_unit(Vec3::ZERO, BehaviorState::Idle));
        assert_eq!(view.len(), 1);

        view.retarget(&ReplicaWorld::new());
        assert!(view.is_empty());
    }

    #[test]
    fn test_yaw_takes_the_short_arc() {
        let mut view = RenderView::new(0.5);
        let mut replica = replica_with_unit(Vec3::ZERO, BehaviorState::Idle);
        view.retarget(&replica);

        // Target just past the -π/π seam relative to current yaw (0).
        replica.agents.get_mut(&UnitId(1)).unwrap().yaw = 3.0;
        view.retarget(&replica);
        view.advance();

        let yaw = view.entities()[&EntityKey::Unit(UnitId(1))].yaw;
        assert!(yaw > 1.0, "moved toward 3.0 the short way, got {yaw}");
    }

    #[test]
    fn test_players_render_with_stance_hint() {
        let mut replica = ReplicaWorld::new();
        replica.identity = "me".to_string();
        let mut p = PlayerState::new("other", 2);
        p.stance = skirmish_world::Stance::Crouched;
        replica.players.insert("other".to_string(), p);

        let mut view = RenderView::default();
        view.retarget(&replica);
        assert_eq!(
            view.entities()[&EntityKey::Player("other".to_string())].hint,
            AnimationHint::Crouched
        );
    }
}
