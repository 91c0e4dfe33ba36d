//! The host's authoritative simulation and tick loop core.
//!
//! `HostSimulation::tick` runs the per-tick pipeline from the protocol
//! contract: advance every agent through the behavior machine, sweep expired
//! corpses, integrate shared scalars, assemble the outbound snapshot (delta
//! normally, full on the watchdog interval), then consume buffered follower
//! input — last write per slot wins.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use skirmish_config::Config;
use skirmish_world::{
    AgentUnit, BehaviorParams, BehaviorState, BloomMarker, Contact, CorpseEntity, DirtyTracker,
    Faction, LootCache, LootId, MAX_SLOTS, PlayerState, Reputation, ReputationAction, UnitEffect,
    UnitId, UnitTickCtx, WorldDelta, WorldSnapshot, advance_unit, populate, sweep_expired,
};

use crate::messages::{DiscreteEvent, Message, UnitCommand};

/// Wall-clock milliseconds since the Unix epoch. Corpse decay anchors on
/// these stamps, so host and followers agree on expiry without messages.
pub fn unix_now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Host simulation tuning, lifted from [`Config`].
#[derive(Debug, Clone)]
pub struct SimSettings {
    /// Behavior machine tuning.
    pub behavior: BehaviorParams,
    /// In-game hours per real second.
    pub time_scale: f32,
    /// Corpse decay duration (ms).
    pub corpse_decay_ms: u64,
    /// Watchdog interval between unconditional full snapshots.
    pub full_sync_interval: Duration,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            behavior: BehaviorParams::default(),
            time_scale: 0.02,
            corpse_decay_ms: 1_200_000,
            full_sync_interval: Duration::from_secs(5),
        }
    }
}

impl SimSettings {
    /// Build settings from the loaded config.
    pub fn from_config(config: &Config) -> Self {
        let w = &config.world;
        Self {
            behavior: BehaviorParams {
                detection_radius: w.detection_radius,
                night_start_hour: w.night_start_hour,
                night_end_hour: w.night_end_hour,
                wander_radius: w.wander_radius,
                arrival_tolerance: w.arrival_tolerance,
                follow_distance: w.follow_distance,
                ..BehaviorParams::default()
            },
            time_scale: w.time_scale,
            corpse_decay_ms: w.corpse_decay_ms,
            full_sync_interval: Duration::from_secs(u64::from(
                config.network.full_sync_interval_secs,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick schedule
// ---------------------------------------------------------------------------

/// Fixed-step accumulator: converts real elapsed time into whole ticks so a
/// stalled host catches up instead of slowing the simulated world.
pub struct TickSchedule {
    accumulator_secs: f64,
    tick_duration_secs: f64,
    total_ticks: u64,
}

impl TickSchedule {
    /// Schedule at the given rate.
    pub fn with_rate(hz: u32) -> Self {
        Self {
            accumulator_secs: 0.0,
            tick_duration_secs: 1.0 / f64::from(hz.max(1)),
            total_ticks: 0,
        }
    }

    /// Accumulate elapsed time; returns how many ticks to run now.
    pub fn accumulate(&mut self, dt_secs: f64) -> u32 {
        self.accumulator_secs += dt_secs;
        let mut ticks = 0;
        while self.accumulator_secs >= self.tick_duration_secs {
            self.accumulator_secs -= self.tick_duration_secs;
            self.total_ticks += 1;
            ticks += 1;
        }
        ticks
    }

    /// Total ticks yielded since creation.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// One tick's duration in seconds.
    pub fn tick_duration_secs(&self) -> f64 {
        self.tick_duration_secs
    }
}

// ---------------------------------------------------------------------------
// HostSimulation
// ---------------------------------------------------------------------------

/// What one tick produced: the snapshot to broadcast plus any discrete
/// events (ranged-attack effects and the like).
pub struct TickOutput {
    /// `DeltaSync` normally, `FullSync` on the watchdog interval.
    pub message: Message,
    /// Events to broadcast alongside.
    pub events: Vec<DiscreteEvent>,
}

/// The canonical world. Exists only on the host.
pub struct HostSimulation {
    seed: u64,
    settings: SimSettings,
    tick: u64,
    time_of_day: f32,
    reputation: Reputation,
    players: [Option<PlayerState>; MAX_SLOTS],
    agents: Vec<AgentUnit>,
    corpses: Vec<CorpseEntity>,
    blooms: Vec<BloomMarker>,
    loot: Vec<LootCache>,
    dirty: DirtyTracker,
    pending_inputs: [Option<PlayerState>; MAX_SLOTS],
    removed_units: Vec<UnitId>,
    corpses_added: Vec<CorpseEntity>,
    newly_looted: Vec<LootId>,
    since_full_secs: f32,
    rng: StdRng,
}

impl HostSimulation {
    /// Fresh world at noon with default counters.
    pub fn new(seed: u64, settings: SimSettings) -> Self {
        Self {
            seed,
            settings,
            tick: 0,
            time_of_day: 12.0,
            reputation: Reputation::default(),
            players: Default::default(),
            agents: Vec::new(),
            corpses: Vec::new(),
            blooms: Vec::new(),
            loot: Vec::new(),
            dirty: DirtyTracker::new(),
            pending_inputs: Default::default(),
            removed_units: Vec::new(),
            corpses_added: Vec::new(),
            newly_looted: Vec::new(),
            since_full_secs: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Add a single unit mid-session (scripted reinforcements and the like).
    pub fn spawn_agent(&mut self, unit: AgentUnit) {
        self.dirty.mark(unit.id);
        self.agents.push(unit);
    }

    /// Spawn agents and loot from the seed for the occupied slots.
    pub fn populate(&mut self, occupied_slots: &[u8]) {
        let (agents, loot) = populate(self.seed, occupied_slots);
        tracing::info!(
            units = agents.len(),
            caches = loot.len(),
            "world populated from seed {}",
            self.seed
        );
        self.agents = agents;
        self.loot = loot;
    }

    /// The shared world seed.
    pub fn world_seed(&self) -> u64 {
        self.seed
    }

    /// Current tick counter.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Current in-game hour.
    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Shared reputation counters.
    pub fn reputation(&self) -> Reputation {
        self.reputation
    }

    /// Live agent units.
    pub fn agents(&self) -> &[AgentUnit] {
        &self.agents
    }

    /// Decaying corpses.
    pub fn corpses(&self) -> &[CorpseEntity] {
        &self.corpses
    }

    /// Markers left by decayed corpses.
    pub fn blooms(&self) -> &[BloomMarker] {
        &self.blooms
    }

    /// Seated players' avatar states.
    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().flatten()
    }

    /// Supply caches (taken and untaken).
    pub fn loot(&self) -> &[LootCache] {
        &self.loot
    }

    /// Buffer a participant's avatar state for the next tick. Later writes
    /// for the same slot replace earlier ones — last message wins.
    pub fn buffer_player_state(&mut self, slot: u8, mut state: PlayerState) {
        let idx = usize::from(slot);
        if idx >= MAX_SLOTS {
            return;
        }
        state.slot = slot;
        self.pending_inputs[idx] = Some(state);
    }

    /// Drop a departed participant's avatar (their slot was freed).
    pub fn remove_player(&mut self, slot: u8) {
        let idx = usize::from(slot);
        if idx < MAX_SLOTS {
            self.players[idx] = None;
            self.pending_inputs[idx] = None;
        }
    }

    /// Apply an order to the subset of `unit_ids` owned by `owner_slot`.
    /// Move orders fan the units out on a small grid around the target.
    pub fn issue_command(&mut self, owner_slot: u8, unit_ids: &[UnitId], command: &UnitCommand) {
        let owned: Vec<UnitId> = unit_ids
            .iter()
            .copied()
            .filter(|id| {
                self.agents
                    .iter()
                    .any(|u| u.id == *id && u.owner_slot == Some(owner_slot))
            })
            .collect();

        let cols = (owned.len() as f32).sqrt().ceil().max(1.0) as usize;
        const SPACING: f32 = 2.0;

        for (i, id) in owned.iter().enumerate() {
            let Some(unit) = self.agents.iter_mut().find(|u| u.id == *id) else {
                continue;
            };
            match command {
                UnitCommand::Move(target) => {
                    let row = i / cols;
                    let col = i % cols;
                    let offset = glam::Vec3::new(
                        (col as f32 - cols as f32 / 2.0) * SPACING,
                        0.0,
                        row as f32 * SPACING,
                    );
                    unit.state = BehaviorState::Moving;
                    unit.disposition = BehaviorState::Moving;
                    unit.nav_target = Some(*target + offset);
                }
                UnitCommand::Follow => {
                    unit.state = BehaviorState::FollowOwner;
                    unit.disposition = BehaviorState::FollowOwner;
                    unit.nav_target = None;
                }
                UnitCommand::Charge => {
                    unit.state = BehaviorState::ChargeTarget;
                    unit.disposition = BehaviorState::ChargeTarget;
                    unit.nav_target = None;
                }
                UnitCommand::Hold => {
                    unit.state = BehaviorState::HoldPosition;
                    unit.disposition = BehaviorState::HoldPosition;
                    unit.nav_target = None;
                }
                // Attack is a host-emitted effect, never an order.
                UnitCommand::Attack(_) => {}
            }
            self.dirty.mark(*id);
        }
    }

    /// Damage a unit. At zero health it converts into a corpse and the
    /// returned `UNIT_KILLED` event should be broadcast.
    pub fn apply_damage(&mut self, id: UnitId, amount: f32, now_ms: u64) -> Option<DiscreteEvent> {
        let unit = self.agents.iter_mut().find(|u| u.id == id)?;
        unit.health -= amount;
        let dead = unit.is_dead();
        self.dirty.mark(id);
        if dead {
            return self.destroy_unit(id, now_ms);
        }
        None
    }

    /// Destroy a unit outright (already-verified kill report).
    pub fn kill_unit(&mut self, id: UnitId, now_ms: u64) -> Option<DiscreteEvent> {
        self.destroy_unit(id, now_ms)
    }

    fn destroy_unit(&mut self, id: UnitId, now_ms: u64) -> Option<DiscreteEvent> {
        let idx = self.agents.iter().position(|u| u.id == id)?;
        let unit = self.agents.swap_remove(idx);
        let corpse = CorpseEntity {
            position: unit.position,
            color_tag: unit.color_tag,
            time_of_death_ms: now_ms,
        };
        self.corpses.push(corpse.clone());
        self.corpses_added.push(corpse);
        self.removed_units.push(id);
        tracing::debug!("unit {:?} destroyed", id);
        Some(DiscreteEvent::UnitKilled {
            id,
            position: unit.position,
            color_tag: unit.color_tag,
            time_of_death_ms: now_ms,
        })
    }

    /// Mark a cache taken. Returns `false` if it was already gone (duplicate
    /// or racing report — receivers check existence before acting).
    pub fn take_loot(&mut self, id: LootId) -> bool {
        match self.loot.iter_mut().find(|c| c.id == id && !c.taken) {
            Some(cache) => {
                cache.taken = true;
                self.newly_looted.push(id);
                true
            }
            None => false,
        }
    }

    /// Apply a reported reputation action.
    pub fn record_action(&mut self, action: ReputationAction) {
        self.reputation.apply(action);
    }

    /// Assemble a complete snapshot of the current world.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            time_of_day: self.time_of_day,
            reputation: self.reputation,
            players: self.players.iter().flatten().cloned().collect(),
            agents: self.agents.iter().map(Into::into).collect(),
            corpses: self.corpses.clone(),
            looted: self
                .loot
                .iter()
                .filter(|c| c.taken)
                .map(|c| c.id)
                .collect(),
        }
    }

    /// A `FullSync` message for a joining (or rejoining) follower.
    pub fn full_sync(&self) -> Message {
        Message::FullSync(self.snapshot())
    }

    /// Run one authority tick.
    pub fn tick(&mut self, dt: f32, now_ms: u64) -> TickOutput {
        self.tick += 1;
        let mut events = Vec::new();

        // (1) Advance every agent through the behavior machine.
        let contacts = self.build_contacts();
        let owner_positions = self.owner_positions();
        let mut unit_effects: Vec<UnitEffect> = Vec::new();
        for unit in &mut self.agents {
            let ctx = UnitTickCtx {
                now_ms,
                dt,
                time_of_day: self.time_of_day,
                reputation: &self.reputation,
                contacts: &contacts,
                owner_positions,
                params: &self.settings.behavior,
            };
            if advance_unit(unit, &ctx, &mut self.rng, &mut unit_effects) {
                self.dirty.mark(unit.id);
            }
        }
        for effect in unit_effects {
            match effect {
                UnitEffect::RangedAttack { attacker, target } => {
                    events.push(DiscreteEvent::CommandIssued {
                        unit_ids: vec![attacker],
                        command: UnitCommand::Attack(target),
                    });
                }
                UnitEffect::Heal { target, amount } => {
                    if let Some(unit) = self.agents.iter_mut().find(|u| u.id == target) {
                        unit.health = (unit.health + amount).min(100.0);
                        self.dirty.mark(target);
                    }
                }
            }
        }

        // (2) Sweep expired corpses into bloom markers.
        let markers = sweep_expired(&mut self.corpses, now_ms, self.settings.corpse_decay_ms);
        self.blooms.extend(markers);

        // (3) Integrate shared scalars.
        self.time_of_day =
            (self.time_of_day + dt * self.settings.time_scale).rem_euclid(24.0);

        // (4) Assemble the broadcast.
        self.since_full_secs += dt;
        let message = if self.since_full_secs >= self.settings.full_sync_interval.as_secs_f32() {
            self.since_full_secs = 0.0;
            self.dirty.drain();
            self.removed_units.clear();
            self.corpses_added.clear();
            self.newly_looted.clear();
            self.full_sync()
        } else {
            let dirty = self.dirty.drain();
            Message::DeltaSync(WorldDelta {
                tick: self.tick,
                time_of_day: self.time_of_day,
                reputation: self.reputation,
                players: self.players.iter().flatten().cloned().collect(),
                agents: self
                    .agents
                    .iter()
                    .filter(|u| dirty.contains(&u.id))
                    .map(Into::into)
                    .collect(),
                agents_removed: std::mem::take(&mut self.removed_units),
                corpses_added: std::mem::take(&mut self.corpses_added),
                looted: std::mem::take(&mut self.newly_looted),
            })
        };

        // (5) Consume buffered input — last message per slot wins.
        for pending in &mut self.pending_inputs {
            if let Some(state) = pending.take() {
                let idx = usize::from(state.slot);
                self.players[idx] = Some(state);
            }
        }

        TickOutput { message, events }
    }

    fn build_contacts(&self) -> Vec<Contact> {
        let mut contacts: Vec<Contact> = self
            .agents
            .iter()
            .map(|u| Contact {
                id: Some(u.id),
                faction: u.faction,
                position: u.position,
                health: u.health,
                is_player: false,
            })
            .collect();
        contacts.extend(self.players.iter().flatten().map(|p| Contact {
            id: None,
            faction: Faction::Squad,
            position: p.position,
            health: 100.0,
            is_player: true,
        }));
        contacts
    }

    fn owner_positions(&self) -> [Option<glam::Vec3>; MAX_SLOTS] {
        std::array::from_fn(|i| self.players[i].as_ref().map(|p| p.position))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
