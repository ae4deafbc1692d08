//! HTTP adapter for the hosted record store.
//!
//! The store speaks a PostgREST-style row API: rows are filtered with
//! `column=eq.value` query parameters, writes ask for the stored row
//! back with `Prefer: return=representation`, and every response body is
//! a JSON array of rows. Network and decode failures map onto
//! [`StoreError`] so the service layer can degrade to the cache.

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

use tacops_domain::ProfileRecord;

use crate::error::StoreError;
use crate::ports::{ProfilePatch, RecordStore};

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project base URL, without a trailing slash.
    pub base_url: String,
    pub api_key: String,
    /// Table holding one row per profile.
    pub table: String,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            table: "player_profiles".to_string(),
        }
    }

    fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

pub struct HttpRecordStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl HttpRecordStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| StoreError::payload(format!("invalid api key: {e}")))?;
        headers.insert("apikey", key);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| StoreError::payload(format!("invalid api key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::unreachable(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Every row endpoint answers with a JSON array of rows.
    async fn decode_rows(response: reqwest::Response) -> Result<Vec<ProfileRecord>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::unreachable(format!("{status}: {body}")));
        }
        response
            .json::<Vec<ProfileRecord>>()
            .await
            .map_err(|e| StoreError::payload(e.to_string()))
    }

    fn first_row(mut rows: Vec<ProfileRecord>) -> Result<ProfileRecord, StoreError> {
        if rows.is_empty() {
            return Err(StoreError::payload("store returned no rows"));
        }
        Ok(rows.swap_remove(0))
    }
}

#[async_trait::async_trait(?Send)]
impl RecordStore for HttpRecordStore {
    async fn get(&self, identity: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let response = self
            .client
            .get(self.config.rows_url())
            .query(&[
                ("participant_uuid", format!("eq.{identity}")),
                ("select", "*".to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::unreachable(e.to_string()))?;

        let rows = Self::decode_rows(response).await?;
        debug!(identity, found = !rows.is_empty(), "profile fetch");
        Ok(rows.into_iter().next())
    }

    async fn create(
        &self,
        identity: &str,
        initial_balance: i64,
        display_name: &str,
    ) -> Result<ProfileRecord, StoreError> {
        let response = self
            .client
            .post(self.config.rows_url())
            .header("Prefer", "return=representation")
            .json(&json!({
                "participant_uuid": identity,
                "credit_balance": initial_balance,
                "display_name": display_name,
                "settings": {},
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await
            .map_err(|e| StoreError::unreachable(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::AlreadyExists(identity.to_string()));
        }
        Self::first_row(Self::decode_rows(response).await?)
    }

    async fn update(
        &self,
        identity: &str,
        patch: ProfilePatch,
    ) -> Result<ProfileRecord, StoreError> {
        let response = self
            .client
            .patch(self.config.rows_url())
            .query(&[("participant_uuid", format!("eq.{identity}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| StoreError::unreachable(e.to_string()))?;

        Self::first_row(Self::decode_rows(response).await?)
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<ProfileRecord>, StoreError> {
        let response = self
            .client
            .get(self.config.rows_url())
            .query(&[
                ("select", "*".to_string()),
                ("order", "credit_balance.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::unreachable(e.to_string()))?;

        Self::decode_rows(response).await
    }
}
