//! Driver ports wrapping the two realtime SDKs.
//!
//! The adapters in [`crate::transport`] normalize these into the single
//! [`crate::ports::RoomTransport`] capability. A driver is deliberately
//! dumb: it exposes the backend's own shape (full room-state snapshots
//! for the sync-room SDK, discrete relayed events for the relay SDK) and
//! the adapter does the diffing and translation.
//!
//! Signal delivery is poll-based: the host loop pumps the adapter once
//! per frame and the adapter drains `poll()` until empty, so everything
//! stays on the one cooperative thread.

use glam::Vec3;

use tacops_protocol::{ClientMessage, ParticipantId, RoomConfig, RoomId, RoomInfo};

use crate::error::TransportError;

// =============================================================================
// Sync-room backend (synchronized room state)
// =============================================================================

/// One participant's fields inside a full room-state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session_id: ParticipantId,
    pub display_name: String,
    pub position: Vec3,
    pub yaw: f32,
    pub alive: bool,
}

/// A full authoritative room state as pushed by the room server.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomStateSnapshot {
    pub room_name: String,
    pub players: Vec<PlayerSnapshot>,
}

/// Raw signals from a joined sync-room.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRoomSignal {
    /// Periodic full-state broadcast from the room authority.
    State(RoomStateSnapshot),
    /// A relayed `playerState` custom message.
    PlayerState {
        session_id: ParticipantId,
        position: Vec3,
        yaw: f32,
        sent_at_ms: u64,
    },
    /// Room-level error. Not necessarily fatal.
    Error { code: i32, message: String },
    /// The server dropped us (or confirmed our leave).
    Left { reason: String },
}

/// A joined room on the sync-room backend.
pub trait SyncRoomHandle {
    fn room_id(&self) -> RoomId;
    fn room_name(&self) -> String;
    fn local_session_id(&self) -> ParticipantId;
    fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError>;
    /// Drain one pending signal, if any.
    fn poll(&mut self) -> Option<SyncRoomSignal>;
    fn leave(&mut self) -> Result<(), TransportError>;
}

/// The sync-room SDK connection itself.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait(?Send)]
pub trait SyncRoomDriver {
    /// Open the client connection. Fails with `Unavailable` when the
    /// SDK is missing and `ConnectionFailed` when the endpoint rejects.
    fn connect(&mut self, server_url: &str, user_id: &str) -> Result<(), TransportError>;

    async fn create(
        &mut self,
        config: &RoomConfig,
    ) -> Result<Box<dyn SyncRoomHandle>, TransportError>;

    async fn join_by_id(
        &mut self,
        room_id: &str,
    ) -> Result<Box<dyn SyncRoomHandle>, TransportError>;

    async fn join_by_name(
        &mut self,
        room_name: &str,
    ) -> Result<Box<dyn SyncRoomHandle>, TransportError>;
}

// =============================================================================
// Relay backend (event/message relay)
// =============================================================================

/// Event code for relayed player-state payloads.
pub const RELAY_EVENT_PLAYER_STATE: u8 = 1;

/// Event code for relayed aliveness toggles.
pub const RELAY_EVENT_ALIVE: u8 = 2;

/// Room status as reported by the relay SDK after create/join.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRoomStatus {
    pub room_id: RoomId,
    pub name: String,
    pub max_players: u32,
    /// Actors already in the room at join time, local one included.
    pub actors: Vec<tacops_protocol::MemberInfo>,
}

/// Raw signals from the relay connection.
#[derive(Debug, Clone, PartialEq)]
pub enum RelaySignal {
    /// Lobby pushed a fresh joinable-room list.
    RoomList(Vec<RoomInfo>),
    ActorJoined {
        participant_id: ParticipantId,
        display_name: String,
    },
    ActorLeft { participant_id: ParticipantId },
    /// An application event raised by another participant.
    Custom {
        code: u8,
        payload: serde_json::Value,
    },
    Disconnected { reason: String },
}

/// The relay SDK connection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait(?Send)]
pub trait RelayDriver {
    /// Connect to the region master and enter the lobby.
    fn connect(&mut self, app_id: &str, region: &str, user_id: &str)
        -> Result<(), TransportError>;

    fn set_display_name(&mut self, name: &str);

    async fn create_room(
        &mut self,
        room_name: &str,
        max_players: u32,
    ) -> Result<RelayRoomStatus, TransportError>;

    async fn join_room(&mut self, room_id: &str) -> Result<RelayRoomStatus, TransportError>;

    /// Broadcast an application event to the other participants.
    fn raise_event(&mut self, code: u8, payload: serde_json::Value)
        -> Result<(), TransportError>;

    /// Drain one pending signal, if any.
    fn poll(&mut self) -> Option<RelaySignal>;

    /// Leave the room and tear the connection down. Must not fail.
    fn disconnect(&mut self);

    fn in_room(&self) -> bool;
}
