//! Factions, shared reputation counters, and the hostility rules that feed
//! the behavior machine.

use serde::{Deserialize, Serialize};

/// Faction of a unit or participant. Player avatars belong to `Squad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Player-owned squad units and player avatars.
    Squad,
    /// Village civilians.
    Citizen,
    /// Wandering merchants.
    Trader,
    /// Village guards.
    Guard,
    /// Hostiles from the wilderness.
    Raider,
}

/// Reputation threshold below which guards treat the squad as hostile.
pub const GUARD_HOSTILITY_THRESHOLD: i32 = -20;

/// Shared per-faction standing counters, owned by the host and replicated
/// as part of every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    /// Squad standing.
    pub squad: i32,
    /// Citizen standing. This is the counter the guards act on.
    pub citizen: i32,
    /// Raider standing.
    pub raider: i32,
}

impl Default for Reputation {
    fn default() -> Self {
        Self {
            squad: 100,
            citizen: 0,
            raider: -100,
        }
    }
}

/// Player actions that move reputation, reported via ACTION_LOGGED events
/// and applied host-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationAction {
    /// Trading with a local: +5 citizen standing.
    Trade,
    /// Threatening a civilian: -15 citizen standing.
    Threaten,
}

impl Reputation {
    /// Apply a reported player action.
    pub fn apply(&mut self, action: ReputationAction) {
        match action {
            ReputationAction::Trade => self.citizen += 5,
            ReputationAction::Threaten => self.citizen -= 15,
        }
    }
}

/// Whether a unit of faction `of` treats a contact of faction `toward` as a
/// hostile target.
///
/// `toward_is_player` distinguishes a player avatar from a squad unit: the
/// guard reprisal rule applies to both, but only once citizen standing has
/// dropped past [`GUARD_HOSTILITY_THRESHOLD`].
pub fn is_hostile(
    of: Faction,
    toward: Faction,
    toward_is_player: bool,
    reputation: &Reputation,
) -> bool {
    match of {
        Faction::Raider => toward != Faction::Raider,
        Faction::Guard => {
            toward == Faction::Raider
                || ((toward == Faction::Squad || toward_is_player)
                    && reputation.citizen < GUARD_HOSTILITY_THRESHOLD)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raiders_hate_everyone_else() {
        let rep = Reputation::default();
        assert!(is_hostile(Faction::Raider, Faction::Squad, false, &rep));
        assert!(is_hostile(Faction::Raider, Faction::Citizen, false, &rep));
        assert!(is_hostile(Faction::Raider, Faction::Guard, false, &rep));
        assert!(is_hostile(Faction::Raider, Faction::Squad, true, &rep));
        assert!(!is_hostile(Faction::Raider, Faction::Raider, false, &rep));
    }

    #[test]
    fn test_guards_hate_raiders() {
        let rep = Reputation::default();
        assert!(is_hostile(Faction::Guard, Faction::Raider, false, &rep));
        assert!(!is_hostile(Faction::Guard, Faction::Citizen, false, &rep));
        assert!(!is_hostile(Faction::Guard, Faction::Squad, false, &rep));
    }

    #[test]
    fn test_guards_turn_on_disgraced_squad() {
        let mut rep = Reputation::default();
        assert!(!is_hostile(Faction::Guard, Faction::Squad, true, &rep));

        rep.citizen = -21;
        assert!(is_hostile(Faction::Guard, Faction::Squad, true, &rep));
        assert!(is_hostile(Faction::Guard, Faction::Squad, false, &rep));
        // Civilians are still safe.
        assert!(!is_hostile(Faction::Guard, Faction::Citizen, false, &rep));
    }

    #[test]
    fn test_civilians_and_traders_never_initiate() {
        let rep = Reputation {
            citizen: -100,
            ..Default::default()
        };
        for of in [Faction::Citizen, Faction::Trader, Faction::Squad] {
            for toward in [
                Faction::Squad,
                Faction::Citizen,
                Faction::Trader,
                Faction::Guard,
                Faction::Raider,
            ] {
                assert!(!is_hostile(of, toward, false, &rep), "{of:?} vs {toward:?}");
            }
        }
    }

    #[test]
    fn test_reputation_actions() {
        let mut rep = Reputation::default();
        rep.apply(ReputationAction::Trade);
        assert_eq!(rep.citizen, 5);
        rep.apply(ReputationAction::Threaten);
        rep.apply(ReputationAction::Threaten);
        assert_eq!(rep.citizen, -25);
    }
}
