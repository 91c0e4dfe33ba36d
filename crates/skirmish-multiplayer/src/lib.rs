//! Host-authoritative replication for Skirmish sessions.
//!
//! One participant hosts: it owns the canonical world (players, agent
//! units, loot, corpses), runs the behavior machine every tick, and
//! broadcasts snapshots. Up to three followers replicate that state and
//! feed back only their own avatar input. If the host goes away, the
//! session ends for everyone — there is no host migration.

pub mod authority;
pub mod dispatch;
pub mod follower;
pub mod host;
pub mod lobby;
pub mod messages;
pub mod render_view;
pub mod replica;
pub mod resume;
pub mod wire;

pub use authority::{HostSimulation, SimSettings, TickOutput, TickSchedule, unix_now_ms};
pub use dispatch::{FollowerOutcome, HostReply, follower_handle_message, host_handle_message};
pub use follower::{EndReason, FollowerCommand, FollowerStatus, run_follower};
pub use host::{HostCommand, HostSession};
pub use lobby::{ConnectionRegistry, LobbyRoster};
pub use messages::{
    DiscreteEvent, InitAssignment, LobbyState, Message, MessageError, PROTOCOL_VERSION,
    RequestSlotSwitch, UnitCommand, deserialize_message, serialize_message,
};
pub use render_view::{AnimationHint, EntityKey, RenderEntity, RenderView};
pub use replica::ReplicaWorld;
pub use resume::ResumeRecord;
pub use wire::{WireError, decode_frame, encode_frame};
