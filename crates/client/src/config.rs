//! Multiplayer and reconciliation configuration.
//!
//! Which transport backend runs is a configuration decision made at
//! startup, never a code-path decision; the session layer only ever
//! sees `dyn RoomTransport`.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which realtime backend the adapter wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportBackend {
    /// Synchronized-room-state backend: the room authority pushes full
    /// state snapshots which the adapter diffs into membership events.
    SyncRoom,
    /// Event/message-relay backend: membership and state arrive as
    /// discrete relayed events.
    Relay,
}

/// Fixed-interval economy reconciliation schedule.
///
/// Interval and jitter are explicit configuration; the reconcile
/// operation itself is idempotent, so an overlapping invocation is safe
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub interval: Duration,
    pub jitter: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            jitter: Duration::from_millis(500),
        }
    }
}

impl ReconcileConfig {
    /// Delay until the next reconcile pass: the fixed interval plus a
    /// uniform jitter so uncoordinated clients do not thundering-herd
    /// the store.
    pub fn next_delay(&self, rng: &mut impl Rng) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        self.interval + Duration::from_millis(rng.gen_range(0..=self.jitter.as_millis() as u64))
    }
}

/// Top-level multiplayer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplayerConfig {
    pub backend: TransportBackend,
    /// Sync-room backend: websocket endpoint of the room server.
    pub server_url: String,
    /// Relay backend: application id issued by the relay cloud.
    pub app_id: String,
    /// Relay backend: target region, e.g. "eu", "us", "asia".
    pub region: String,
    pub default_max_players: u32,
    pub reconcile: ReconcileConfig,
}

impl Default for MultiplayerConfig {
    fn default() -> Self {
        Self {
            backend: TransportBackend::SyncRoom,
            server_url: "ws://localhost:2567".to_string(),
            app_id: String::new(),
            region: "asia".to_string(),
            default_max_players: 8,
            reconcile: ReconcileConfig::default(),
        }
    }
}
