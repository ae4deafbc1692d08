//! Wire vocabulary for room-based multiplayer.
//!
//! These types are exchanged between the client and the room authority.
//! The exact byte encoding is backend-specific (a synchronized-room-state
//! backend serializes them into schema patches, a relay backend into
//! event payloads); both backends must surface the same semantic events,
//! which is what `RoomEvent` enumerates.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Removing or renaming variants is a breaking change

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Transport-issued key for a connected participant within a room.
pub type ParticipantId = String;

/// Server-assigned room identifier.
pub type RoomId = String;

/// A position/orientation sample for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Heading around the vertical axis, radians.
    pub yaw: f32,
}

impl Pose {
    pub const ORIGIN: Pose = Pose {
        position: Vec3::ZERO,
        yaw: 0.0,
    };

    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }
}

/// Equipment stat snapshot sent with `Join` so the room authority can
/// apply loadout-derived combat stats server-side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub max_hp: u32,
    pub max_armor: u32,
    pub weapon_damage_scale: f32,
    pub weapon_headshot_multiplier: f32,
    pub ammo_damage_multiplier: f32,
}

impl Default for EquipmentSnapshot {
    fn default() -> Self {
        Self {
            max_hp: 100,
            max_armor: 50,
            weapon_damage_scale: 1.0,
            weapon_headshot_multiplier: 2.0,
            ammo_damage_multiplier: 1.0,
        }
    }
}

// =============================================================================
// Client Messages (client -> room authority)
// =============================================================================

/// Messages from the client to the room authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Announce the local player and its loadout stats after joining.
    Join {
        display_name: String,
        equipment: EquipmentSnapshot,
    },
    /// Positional/rotational update for the local player.
    Move { x: f32, y: f32, z: f32, yaw: f32 },
}

impl ClientMessage {
    pub fn from_pose(pose: &Pose) -> Self {
        Self::Move {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
            yaw: pose.yaw,
        }
    }
}

// =============================================================================
// Room events (room authority -> client, backend-normalized)
// =============================================================================

/// A participant as seen in the room roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub participant_id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default = "default_true")]
    pub alive: bool,
}

fn default_true() -> bool {
    true
}

impl MemberInfo {
    pub fn new(participant_id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            display_name: display_name.into(),
            team: None,
            alive: true,
        }
    }
}

/// A remote participant's latest authoritative pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStateUpdate {
    pub participant_id: ParticipantId,
    pub pose: Pose,
    /// Sender wall clock, milliseconds since the epoch.
    pub sent_at_ms: u64,
}

/// The semantic events every transport backend must surface.
///
/// `MembershipSnapshot` is emitted exactly once per joined room, before
/// any diff event, covering all pre-existing participants (local one
/// included) so the registry never double-adds or misses anyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEvent {
    MembershipSnapshot(Vec<MemberInfo>),
    MemberJoined(MemberInfo),
    MemberLeft(ParticipantId),
    AliveChanged { participant_id: ParticipantId, alive: bool },
    StateUpdate(RemoteStateUpdate),
    Disconnected { reason: String },
}

// =============================================================================
// Room metadata
// =============================================================================

/// A joinable room as listed in the lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub name: String,
    pub owner_name: String,
    pub current_players: u32,
    pub max_players: u32,
}

/// Options for creating a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub room_name: String,
    pub max_players: u32,
    pub difficulty: String,
    pub mode: String,
    pub created_by: String,
}

impl RoomConfig {
    pub fn arena(room_name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            max_players: 8,
            difficulty: "normal".to_string(),
            mode: "mp_arena".to_string(),
            created_by: created_by.into(),
        }
    }
}

/// Target of a join call: a concrete room id, or a named room to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinTarget {
    RoomId(RoomId),
    RoomName(String),
}
