//! Shared world data model for Skirmish sessions, plus the agent behavior
//! state machine that only the session host runs.
//!
//! Everything here is plain data + pure-ish functions: the host simulation
//! and the follower replica both build on these types, and the behavior
//! machine takes its randomness and clock as inputs so tests stay
//! deterministic.

pub mod agent;
pub mod behavior;
pub mod corpse;
pub mod faction;
pub mod loot;
pub mod player;
pub mod populate;
pub mod snapshot;

pub use agent::{AgentState, AgentUnit, BehaviorState, Job, UnitId};
pub use behavior::{BehaviorParams, Contact, UnitEffect, UnitTickCtx, advance_unit, is_night};
pub use corpse::{BloomMarker, CorpseEntity, sweep_expired};
pub use faction::{Faction, Reputation, ReputationAction, is_hostile};
pub use loot::{LootCache, LootId};
pub use player::{MAX_SLOTS, PlayerState, Stance};
pub use populate::populate;
pub use snapshot::{DirtyTracker, WorldDelta, WorldSnapshot};
