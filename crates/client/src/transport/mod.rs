//! Transport session adapters.
//!
//! Two interchangeable backends, one capability interface. Which one
//! runs is decided by [`MultiplayerConfig::backend`] at startup; the
//! session layer never branches on the backend again.

mod fanout;
pub mod relay;
pub mod sync_room;

pub use fanout::EventFan;
pub use relay::RelayTransport;
pub use sync_room::SyncRoomTransport;

use tracing::error;

use crate::config::{MultiplayerConfig, TransportBackend};
use crate::error::TransportError;
use crate::ports::{RelayDriver, RoomTransport, SyncRoomDriver};

/// The driver the host managed to load for each backend. A missing
/// driver means that SDK is absent on this install.
#[derive(Default)]
pub struct TransportDrivers {
    pub sync_room: Option<Box<dyn SyncRoomDriver>>,
    pub relay: Option<Box<dyn RelayDriver>>,
}

/// Build the configured transport.
///
/// Fails with [`TransportError::Unavailable`] when the configured
/// backend's SDK is missing; the caller disables the multiplayer
/// feature and continues single-player.
pub fn create_transport(
    config: &MultiplayerConfig,
    drivers: TransportDrivers,
) -> Result<Box<dyn RoomTransport>, TransportError> {
    match config.backend {
        TransportBackend::SyncRoom => {
            let driver = drivers.sync_room.ok_or_else(|| {
                error!("sync-room SDK not loaded; multiplayer disabled");
                TransportError::unavailable("sync-room SDK not loaded")
            })?;
            Ok(Box::new(SyncRoomTransport::new(config.clone(), driver)))
        }
        TransportBackend::Relay => {
            let driver = drivers.relay.ok_or_else(|| {
                error!("relay SDK not loaded; multiplayer disabled");
                TransportError::unavailable("relay SDK not loaded")
            })?;
            Ok(Box::new(RelayTransport::new(config.clone(), driver)))
        }
    }
}
