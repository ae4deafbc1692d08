//! Outbound ports.
//!
//! Every external collaborator sits behind one of these traits: the two
//! realtime SDKs (drivers), the unified room transport capability, the
//! remote record store, the 3D scene, and local persisted storage.
//! Adapters implement them; application code depends only on the trait.

pub mod cache;
pub mod drivers;
pub mod record_store;
pub mod scene;
pub mod transport;

pub use cache::{InMemoryProfileCache, ProfileCache};
pub use drivers::{
    PlayerSnapshot, RelayDriver, RelayRoomStatus, RelaySignal, RoomStateSnapshot, SyncRoomDriver,
    SyncRoomHandle, SyncRoomSignal, RELAY_EVENT_ALIVE, RELAY_EVENT_PLAYER_STATE,
};
pub use record_store::{ProfilePatch, RecordStore};
pub use scene::{ActorScene, VisualHandle};
pub use transport::{RoomSession, RoomTransport, Subscription};

#[cfg(any(test, feature = "testing"))]
pub use cache::MockProfileCache;
#[cfg(any(test, feature = "testing"))]
pub use drivers::{MockRelayDriver, MockSyncRoomDriver};
#[cfg(any(test, feature = "testing"))]
pub use record_store::MockRecordStore;
#[cfg(any(test, feature = "testing"))]
pub use scene::MockActorScene;
#[cfg(any(test, feature = "testing"))]
pub use transport::MockRoomTransport;
