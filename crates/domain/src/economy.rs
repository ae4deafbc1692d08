//! Economy records: the server-owned profile and its local cache.
//!
//! The remote record store holds the balance of record. The local cache
//! only exists to survive transient disconnection; a cached balance is
//! never trusted for gameplay gating and stays flagged `pending_sync`
//! until confirmed written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Balance granted to a brand-new profile, exactly once.
pub const STARTING_BALANCE: i64 = 2000;

/// Default display name for profiles that never set one.
pub const DEFAULT_DISPLAY_NAME: &str = "Player";

/// The server-owned profile record, as returned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub participant_uuid: String,
    pub credit_balance: i64,
    pub display_name: String,
    /// Opaque settings blob, owned by the UI layer.
    #[serde(default)]
    pub settings: Value,
    /// Aggregated cross-session stats (kills, best score, ...).
    #[serde(default)]
    pub lifetime_stats: Option<Value>,
}

impl ProfileRecord {
    pub fn new(participant_uuid: impl Into<String>, credit_balance: i64) -> Self {
        Self {
            participant_uuid: participant_uuid.into(),
            credit_balance,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            settings: Value::Object(Default::default()),
            lifetime_stats: None,
        }
    }
}

/// Locally persisted blob keyed by the stable identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    /// Last balance the client saw or optimistically applied.
    pub balance: i64,
    /// Set until the first session completes.
    pub first_time_player: bool,
    /// Set when an optimistic write has not been confirmed remotely.
    pub pending_sync: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for CachedProfile {
    fn default() -> Self {
        Self {
            balance: 0,
            first_time_player: true,
            pending_sync: false,
            updated_at: Utc::now(),
        }
    }
}

impl CachedProfile {
    pub fn with_balance(balance: i64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }
}
