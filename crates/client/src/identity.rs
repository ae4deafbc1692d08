//! Stable client identity.
//!
//! The identity token keys both the remote record store and the local
//! cache blob. It is generated once per install and persisted; losing
//! it means losing the profile, so `load_or_generate` always writes a
//! fresh token back before returning it.

use chrono::Utc;
use tacops_protocol::EquipmentSnapshot;
use uuid::Uuid;

use tacops_domain::DEFAULT_DISPLAY_NAME;

use crate::ports::ProfileCache;

/// Everything the transport needs to announce the local player.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIdentity {
    /// Stable generated token, e.g. `user_1764236484000_1a2b3c4d`.
    pub token: String,
    pub display_name: String,
    /// Loadout-derived stats sent with the room `Join` message.
    pub equipment: EquipmentSnapshot,
}

impl ClientIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            equipment: EquipmentSnapshot::default(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_equipment(mut self, equipment: EquipmentSnapshot) -> Self {
        self.equipment = equipment;
        self
    }

    /// Load the persisted token, or generate and persist a new one.
    pub fn load_or_generate(cache: &mut dyn ProfileCache) -> Self {
        if let Some(token) = cache.load_identity() {
            return Self::new(token);
        }
        let token = generate_token();
        cache.store_identity(&token);
        Self::new(token)
    }
}

fn generate_token() -> String {
    let fragment = Uuid::new_v4().simple().to_string();
    format!(
        "user_{}_{}",
        Utc::now().timestamp_millis(),
        &fragment[..9]
    )
}
