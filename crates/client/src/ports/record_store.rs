//! Remote record store port.
//!
//! A request/response key-value/record store holding the profile of
//! record. All four operations are idempotent from the caller's
//! perspective except `create`, which must never be issued when a
//! record is already known to exist - callers check existence
//! immediately beforehand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tacops_domain::ProfileRecord;

use crate::error::StoreError;

/// A partial update to a profile record.
///
/// `updated_at` always rides along as an ISO-8601 timestamp; the
/// service layer fills it with the current UTC wall clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_stats: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    pub fn balance(balance: i64) -> Self {
        Self {
            credit_balance: Some(balance),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn settings(settings: Value) -> Self {
        Self {
            settings: Some(settings),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn lifetime_stats(stats: Value) -> Self {
        Self {
            lifetime_stats: Some(stats),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// The remote record store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait(?Send)]
pub trait RecordStore {
    /// Fetch a profile. `Ok(None)` when no record exists.
    async fn get(&self, identity: &str) -> Result<Option<ProfileRecord>, StoreError>;

    /// Create a new profile record. Callers must have checked that no
    /// record exists immediately before this call.
    async fn create(
        &self,
        identity: &str,
        initial_balance: i64,
        display_name: &str,
    ) -> Result<ProfileRecord, StoreError>;

    /// Apply a partial update and return the stored record.
    async fn update(
        &self,
        identity: &str,
        patch: ProfilePatch,
    ) -> Result<ProfileRecord, StoreError>;

    /// Top profiles ordered by balance, unfiltered.
    async fn leaderboard(&self, limit: usize) -> Result<Vec<ProfileRecord>, StoreError>;
}
