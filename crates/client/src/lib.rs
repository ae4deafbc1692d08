//! Tacops client core.
//!
//! The multiplayer state-synchronization core for the browser client:
//! two interchangeable room-transport adapters normalized behind one
//! capability interface, the remote actor registry with critically
//! damped interpolation, the session bootstrap state machine, and the
//! economy reconciliation layer with offline-first fallback.
//!
//! Everything external (the realtime SDKs, the remote record store, the
//! 3D scene, local persisted storage) sits behind a port in [`ports`];
//! the core never touches I/O directly.
//!
//! # Concurrency model
//!
//! Single-threaded cooperative scheduling. Transport events are pumped,
//! then applied to the registry, then the per-frame interpolation tick
//! reads the result - membership changes always land before the same
//! tick's interpolation pass. Network operations are async and awaited
//! by the host loop; nothing here blocks.

pub mod actors;
pub mod config;
pub mod economy;
pub mod error;
pub mod hits;
pub mod identity;
pub mod ports;
pub mod session;
pub mod store;
pub mod transport;

pub use actors::RemoteActorRegistry;
pub use config::{MultiplayerConfig, ReconcileConfig, TransportBackend};
pub use economy::EconomyService;
pub use error::{StoreError, TransportError};
pub use hits::LastHitTracker;
pub use identity::ClientIdentity;
pub use session::{SessionBootstrap, SessionNotice, SessionState};
pub use transport::{create_transport, TransportDrivers};
