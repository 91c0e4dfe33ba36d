//! Host-side connection registry and the 4-slot lobby roster.

use std::collections::HashMap;

use skirmish_net::{PeerId, Session};
use skirmish_world::MAX_SLOTS;

use crate::messages::LobbyState;

/// The room roster: slot index → peer identity. Slot 0 is the host.
#[derive(Debug, Default)]
pub struct LobbyRoster {
    slots: [Option<PeerId>; MAX_SLOTS],
}

impl LobbyRoster {
    /// Fresh roster with the host seated in slot 0.
    pub fn new(host: PeerId) -> Self {
        let mut roster = Self::default();
        roster.slots[0] = Some(host);
        roster
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Seat a peer in the first empty slot. Returns the claimed slot, or
    /// `None` when the lobby is full.
    pub fn claim_first_free(&mut self, peer: PeerId) -> Option<u8> {
        debug_assert!(self.slot_of(&peer).is_none(), "peer already seated");
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(peer);
        Some(idx as u8)
    }

    /// Free the slot a peer holds. Returns the vacated slot, if any.
    pub fn release(&mut self, peer: &PeerId) -> Option<u8> {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.as_ref() == Some(peer) {
                *slot = None;
                return Some(idx as u8);
            }
        }
        None
    }

    /// Move a peer to `target`. Granted only when the target slot is empty;
    /// the vacated slot frees up in the same operation.
    pub fn switch(&mut self, peer: &PeerId, target: u8) -> bool {
        let target = usize::from(target);
        if target >= MAX_SLOTS || self.slots[target].is_some() {
            return false;
        }
        let Some(current) = self.slot_of(peer) else {
            return false;
        };
        self.slots[usize::from(current)] = None;
        self.slots[target] = Some(peer.clone());
        true
    }

    /// The slot a peer holds, if any.
    pub fn slot_of(&self, peer: &PeerId) -> Option<u8> {
        self.slots
            .iter()
            .position(|s| s.as_ref() == Some(peer))
            .map(|idx| idx as u8)
    }

    /// Indices of occupied slots.
    pub fn occupied_slots(&self) -> Vec<u8> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(idx, _)| idx as u8)
            .collect()
    }

    /// The wire form broadcast to every participant.
    pub fn to_wire(&self) -> LobbyState {
        LobbyState {
            slots: std::array::from_fn(|i| {
                self.slots[i].as_ref().map(|p| p.as_str().to_string())
            }),
        }
    }
}

/// Open sessions by peer identity. Broadcasting iterates every session; a
/// session that died since the last event is a silent no-op send, so the
/// tick loop never checks liveness.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<PeerId, Session>,
}

impl ConnectionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session.
    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.peer().clone(), session);
    }

    /// Stop tracking a session, returning it for closing.
    pub fn remove(&mut self, peer: &PeerId) -> Option<Session> {
        self.sessions.remove(peer)
    }

    /// Look up a session.
    pub fn get(&self, peer: &PeerId) -> Option<&Session> {
        self.sessions.get(peer)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Send a frame payload to every tracked session.
    pub async fn broadcast(&self, payload: &[u8]) {
        for session in self.sessions.values() {
            session.send(payload).await;
        }
    }

    /// Send a frame payload to one peer. No-op if the peer is unknown.
    pub async fn send_to(&self, peer: &PeerId, payload: &[u8]) {
        if let Some(session) = self.sessions.get(peer) {
            session.send(payload).await;
        }
    }
}
