//! Local persisted cache port.
//!
//! A simple key-value blob keyed by the stable identity token. It holds
//! the last-known balance, the first-time-player flag, and the
//! pending-sync flag - nothing here is ever the balance of record.

use tacops_domain::CachedProfile;

/// Local persisted storage (browser localStorage, a config dir on
/// desktop, or memory in tests).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ProfileCache {
    fn load(&self) -> Option<CachedProfile>;

    fn store(&mut self, profile: &CachedProfile);

    fn clear(&mut self);

    /// The persisted identity token, if one was ever generated.
    fn load_identity(&self) -> Option<String>;

    fn store_identity(&mut self, token: &str);
}

/// In-memory cache, used by tests and as the fallback when no persistent
/// storage is available.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileCache {
    profile: Option<CachedProfile>,
    identity: Option<String>,
}

impl ProfileCache for InMemoryProfileCache {
    fn load(&self) -> Option<CachedProfile> {
        self.profile.clone()
    }

    fn store(&mut self, profile: &CachedProfile) {
        self.profile = Some(profile.clone());
    }

    fn clear(&mut self) {
        self.profile = None;
    }

    fn load_identity(&self) -> Option<String> {
        self.identity.clone()
    }

    fn store_identity(&mut self, token: &str) {
        self.identity = Some(token.to_string());
    }
}
