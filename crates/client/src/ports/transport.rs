//! Room transport capability port.
//!
//! Both backend adapters (sync-room and relay) implement this single
//! interface with identical handler semantics, so the session layer is
//! backend-agnostic. Event delivery is subscription-based: `subscribe`
//! returns a [`Subscription`] whose drop is the disposer - once dropped
//! the adapter stops delivering into it, which is how room teardown
//! guarantees no event ever reaches a cleared registry.

use futures_channel::mpsc;

use tacops_protocol::{JoinTarget, MemberInfo, ParticipantId, Pose, RoomConfig, RoomEvent, RoomId, RoomInfo};

use crate::error::TransportError;
use crate::identity::ClientIdentity;

/// An active room membership.
///
/// Created on a successful create/join; at most one exists per client.
/// `members` is the roster as of the initial snapshot; the session layer
/// keeps it current from diff events afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSession {
    pub room_id: RoomId,
    pub name: String,
    pub local_participant_id: ParticipantId,
    pub members: Vec<MemberInfo>,
}

/// A live event subscription. Dropping it unsubscribes.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<RoomEvent>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<RoomEvent>) -> Self {
        Self { receiver }
    }

    /// Drain one event if available, without blocking.
    pub fn poll_event(&mut self) -> Option<RoomEvent> {
        match self.receiver.try_next() {
            Ok(Some(event)) => Some(event),
            // Ok(None) means the adapter side hung up; either way there
            // is nothing to deliver.
            _ => None,
        }
    }
}

/// The unified room transport interface.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait(?Send)]
pub trait RoomTransport {
    /// Prepare the underlying connection. Idempotent: a second call on
    /// an initialized transport is a no-op.
    fn initialize(&mut self, identity: &ClientIdentity) -> Result<(), TransportError>;

    /// Create a room and join it.
    async fn create_room(&mut self, config: RoomConfig) -> Result<RoomSession, TransportError>;

    /// Join an existing room by id or name.
    async fn join_room(&mut self, target: JoinTarget) -> Result<RoomSession, TransportError>;

    /// Leave the current room. No-op without an active session; the
    /// underlying connection resource is released on every exit path,
    /// even when the remote leave call fails.
    async fn leave_room(&mut self);

    /// Send the local player's pose. Silently dropped when not in a
    /// room or before state sync has settled.
    fn send_local_state(&mut self, pose: &Pose);

    /// Enumerate joinable rooms. Best-effort: backends that cannot
    /// supply a live list return an empty one.
    async fn list_rooms(&mut self) -> Result<Vec<RoomInfo>, TransportError>;

    /// Register for normalized room events.
    fn subscribe(&mut self) -> Subscription;

    /// Poll the backend and fan buffered events out to subscribers.
    /// Called once per frame by the session layer, before the
    /// interpolation tick reads the registry.
    fn pump(&mut self);

    /// The transport-issued id of the local participant, once joined.
    fn local_participant_id(&self) -> Option<ParticipantId>;
}
