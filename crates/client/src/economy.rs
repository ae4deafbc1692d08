//! Economy reconciliation over the record store and the local cache.
//!
//! The store holds the balance of record; this service keeps a local
//! copy good enough to survive disconnection. Every remote write is the
//! full intended balance, never a delta, so a duplicated or overlapping
//! write converges to the same value - reconciliation needs no in-flight
//! guard.
//!
//! Offline policy: an unreachable store degrades to the cached balance
//! with `pending_sync` set, or to a zero balance when nothing was ever
//! fetched. A balance is never fabricated.

use serde_json::Value;
use tracing::{info, warn};

use tacops_domain::{CachedProfile, ProfileRecord, DEFAULT_DISPLAY_NAME, STARTING_BALANCE};

use crate::error::StoreError;
use crate::identity::ClientIdentity;
use crate::ports::{ProfileCache, ProfilePatch, RecordStore};

pub struct EconomyService {
    store: Box<dyn RecordStore>,
    cache: Box<dyn ProfileCache>,
    identity: String,
    display_name: String,
    /// `None` until first contact with either the store or the cache.
    balance: Option<i64>,
    pending_sync: bool,
    first_time_player: bool,
    /// In-process latch: once a record is known to exist (created or
    /// fetched), `create` is never issued again for this identity.
    record_exists: bool,
}

impl EconomyService {
    pub fn new(
        store: Box<dyn RecordStore>,
        cache: Box<dyn ProfileCache>,
        identity: &ClientIdentity,
    ) -> Self {
        Self {
            store,
            cache,
            identity: identity.token.clone(),
            display_name: identity.display_name.clone(),
            balance: None,
            pending_sync: false,
            first_time_player: true,
            record_exists: false,
        }
    }

    /// First contact: fetch or create the profile of record, then settle
    /// any balance the cache accumulated while offline. Infallible by
    /// design - an unreachable store degrades, it does not fail.
    pub async fn bootstrap(&mut self) -> i64 {
        if let Some(cached) = self.cache.load() {
            self.balance = Some(cached.balance);
            self.pending_sync = cached.pending_sync;
            self.first_time_player = cached.first_time_player;
        }

        match self.store.get(&self.identity).await {
            Ok(Some(record)) => {
                self.record_exists = true;
                self.settle_pending(record).await;
            }
            Ok(None) => {
                // Existence checked immediately above; the remaining
                // race window is accepted and create is issued at most
                // once per process.
                if !self.record_exists {
                    self.create_record().await;
                }
            }
            Err(err) => {
                warn!(%err, "record store unreachable; keeping cached balance");
            }
        }

        self.write_cache();
        self.balance()
    }

    async fn create_record(&mut self) {
        match self
            .store
            .create(&self.identity, STARTING_BALANCE, &self.display_name)
            .await
        {
            Ok(record) => {
                info!(identity = %self.identity, balance = record.credit_balance, "created new profile");
                self.record_exists = true;
                self.balance = Some(record.credit_balance);
                self.pending_sync = false;
            }
            // Lost the create race; the record that won is authoritative.
            Err(StoreError::AlreadyExists(_)) => {
                self.record_exists = true;
                if let Ok(Some(record)) = self.store.get(&self.identity).await {
                    self.balance = Some(record.credit_balance);
                    self.pending_sync = false;
                }
            }
            Err(err) => {
                warn!(%err, "profile create failed; staying on the cached balance");
            }
        }
    }

    /// Settle an offline-accumulated balance against a fresh remote one.
    /// Local wins only when flagged pending AND strictly higher; the
    /// push happens exactly once and clears the flag either way.
    async fn settle_pending(&mut self, record: ProfileRecord) {
        let local = self.balance.unwrap_or(0);
        if self.pending_sync && local > record.credit_balance {
            match self
                .store
                .update(&self.identity, ProfilePatch::balance(local))
                .await
            {
                Ok(updated) => {
                    info!(local, remote = record.credit_balance, "pushed offline balance");
                    self.balance = Some(updated.credit_balance);
                    self.pending_sync = false;
                }
                Err(err) => {
                    warn!(%err, "offline balance push failed; will retry on reconcile");
                }
            }
        } else {
            self.balance = Some(record.credit_balance);
            self.pending_sync = false;
        }
    }

    /// Apply a credit delta optimistically, then write the resulting
    /// full balance through. On write failure the optimistic value is
    /// cached and flagged pending.
    pub async fn apply_delta(&mut self, delta: i64) -> i64 {
        let next = self.balance() + delta;
        self.balance = Some(next);

        match self
            .store
            .update(&self.identity, ProfilePatch::balance(next))
            .await
        {
            Ok(record) => {
                self.balance = Some(record.credit_balance);
                self.pending_sync = false;
            }
            Err(err) => {
                warn!(%err, delta, "balance write failed; flagged pending");
                self.pending_sync = true;
            }
        }
        self.write_cache();
        self.balance()
    }

    /// One reconciliation pass, driven at a fixed interval by the host.
    /// Pushes the pending balance if there is one, otherwise adopts the
    /// remote value. Idempotent: the payload is the full balance.
    pub async fn reconcile(&mut self) {
        if self.pending_sync {
            let local = self.balance();
            match self
                .store
                .update(&self.identity, ProfilePatch::balance(local))
                .await
            {
                Ok(record) => {
                    self.balance = Some(record.credit_balance);
                    self.pending_sync = false;
                }
                Err(err) => warn!(%err, "reconcile push failed; staying pending"),
            }
        } else {
            match self.store.get(&self.identity).await {
                Ok(Some(record)) => {
                    self.record_exists = true;
                    self.balance = Some(record.credit_balance);
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "reconcile fetch failed"),
            }
        }
        self.write_cache();
    }

    /// Current known balance; zero when nothing was ever fetched.
    pub fn balance(&self) -> i64 {
        self.balance.unwrap_or(0)
    }

    pub fn is_pending_sync(&self) -> bool {
        self.pending_sync
    }

    pub fn is_first_time(&self) -> bool {
        self.first_time_player
    }

    /// Mark the first session completed; persisted immediately.
    pub fn mark_played(&mut self) {
        self.first_time_player = false;
        self.write_cache();
    }

    pub async fn set_display_name(&mut self, name: &str) -> anyhow::Result<()> {
        self.store
            .update(&self.identity, ProfilePatch::display_name(name))
            .await?;
        self.display_name = name.to_string();
        Ok(())
    }

    pub async fn save_settings(&mut self, settings: Value) -> anyhow::Result<()> {
        self.store
            .update(&self.identity, ProfilePatch::settings(settings))
            .await?;
        Ok(())
    }

    pub async fn upload_lifetime_stats(&mut self, stats: Value) -> anyhow::Result<()> {
        self.store
            .update(&self.identity, ProfilePatch::lifetime_stats(stats))
            .await?;
        Ok(())
    }

    pub async fn fetch_lifetime_stats(&mut self) -> anyhow::Result<Option<Value>> {
        let record = self.store.get(&self.identity).await?;
        Ok(record.and_then(|r| r.lifetime_stats))
    }

    /// Top profiles by balance, minus unnamed players and profiles that
    /// never earned past the starting balance.
    pub async fn leaderboard(&self, limit: usize) -> anyhow::Result<Vec<ProfileRecord>> {
        let mut records = self.store.leaderboard(limit * 2).await?;
        records.retain(|r| {
            r.display_name != DEFAULT_DISPLAY_NAME && r.credit_balance > STARTING_BALANCE
        });
        records.sort_by(|a, b| b.credit_balance.cmp(&a.credit_balance));
        records.truncate(limit);
        Ok(records)
    }

    fn write_cache(&mut self) {
        self.cache.store(&CachedProfile {
            balance: self.balance(),
            first_time_player: self.first_time_player,
            pending_sync: self.pending_sync,
            updated_at: chrono::Utc::now(),
        });
    }
}
