// ABOUTME: History and profile persistence over the Supabase PostgREST API
// ABOUTME: save_history never raises; read paths surface storage errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # History/Profile Store
//!
//! Persistence behind the [`HistoryStore`] trait, implemented against the
//! Supabase PostgREST API with plain `reqwest` calls. Three tables:
//! `optimization_history`, `profiles`, `subscriptions`.
//!
//! History writes are advisory: [`HistoryStore::save_history`] returns a
//! bool and warn-logs failures, so a broken store can never fail or delay
//! a user-facing optimization.

use crate::config::SupabaseConfig;
use crate::errors::{AppError, AppResult};
use crate::pagination::{PagedResult, PageParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const HISTORY_TABLE: &str = "optimization_history";
const PROFILES_TABLE: &str = "profiles";
const SUBSCRIPTIONS_TABLE: &str = "subscriptions";

// ============================================================================
// Data model
// ============================================================================

/// Who a history record belongs to.
///
/// Exactly one of user id or session id, enforced by construction: there
/// is no variant carrying both or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOwner {
    /// Authenticated user (JWT subject)
    User(String),
    /// Anonymous browser session (`X-Session-Id` header)
    Session(String),
}

impl HistoryOwner {
    /// Column this owner filters on
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::User(_) => "user_id",
            Self::Session(_) => "session_id",
        }
    }

    /// Owner id value
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(id) | Self::Session(id) => id,
        }
    }

    /// `user_type` discriminator persisted alongside the record
    #[must_use]
    pub const fn user_type(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Session(_) => "anonymous",
        }
    }
}

/// One persisted optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Row id
    pub id: i64,
    /// Owning user, for authenticated records
    #[serde(default)]
    pub user_id: Option<String>,
    /// Owning session, for anonymous records
    #[serde(default)]
    pub session_id: Option<String>,
    /// Prompt as submitted
    pub original_prompt: String,
    /// Prompt as optimized
    pub optimized_prompt: String,
    /// Optimization mode
    pub mode: String,
    /// `user` or `anonymous`
    #[serde(default)]
    pub user_type: Option<String>,
    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

/// User profile row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id (JWT subject)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Mutable profile fields accepted from clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(default)]
    pub username: Option<String>,
    /// New avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Subscription row (read-only from this service)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// User id
    pub id: String,
    /// Subscription status
    #[serde(default)]
    pub status: Option<String>,
    /// Plan identifier
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Current period start
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    /// Current period end
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

// ============================================================================
// Trait
// ============================================================================

/// Seam between the HTTP handlers and the persistence backend
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one optimization. Never raises: failures are logged and
    /// reported as `false`.
    async fn save_history(
        &self,
        owner: &HistoryOwner,
        original_prompt: &str,
        optimized_prompt: &str,
        mode: &str,
    ) -> bool;

    /// One page of an owner's history, newest first
    async fn get_history(
        &self,
        owner: &HistoryOwner,
        page: PageParams,
    ) -> AppResult<PagedResult<HistoryRecord>>;

    /// Count an owner's history rows, optionally filtered by mode and a
    /// lower timestamp bound
    async fn get_history_count(
        &self,
        owner: &HistoryOwner,
        mode: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u32>;

    /// Fetch a profile, `None` when the row does not exist yet
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Upsert profile fields and return the stored row
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate)
        -> AppResult<UserProfile>;

    /// Fetch a subscription, `None` when the user has none
    async fn get_subscription(&self, user_id: &str) -> AppResult<Option<Subscription>>;
}

// ============================================================================
// Supabase implementation
// ============================================================================

/// PostgREST-backed [`HistoryStore`]
pub struct SupabaseStore {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    /// Build a store from the Supabase configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL or key is missing, or
    /// when the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> AppResult<Self> {
        if !config.is_configured() {
            return Err(AppError::config(
                "Supabase is not configured: set SUPABASE_URL and SUPABASE_ANON_KEY",
            ));
        }
        url::Url::parse(&config.url)
            .map_err(|e| AppError::config(format!("invalid SUPABASE_URL: {e}")))?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::storage(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }
}

#[async_trait]
impl HistoryStore for SupabaseStore {
    async fn save_history(
        &self,
        owner: &HistoryOwner,
        original_prompt: &str,
        optimized_prompt: &str,
        mode: &str,
    ) -> bool {
        let row = serde_json::json!({
            owner.column(): owner.id(),
            "original_prompt": original_prompt,
            "optimized_prompt": optimized_prompt,
            "mode": mode,
            "user_type": owner.user_type(),
        });

        let result = self
            .request(reqwest::Method::POST, HISTORY_TABLE)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "history insert rejected");
                false
            }
            Err(e) => {
                tracing::warn!("history insert failed: {e}");
                false
            }
        }
    }

    async fn get_history(
        &self,
        owner: &HistoryOwner,
        page: PageParams,
    ) -> AppResult<PagedResult<HistoryRecord>> {
        let page_size = page.page_size();
        let offset = page.offset();
        let range_end = offset + page_size - 1;

        let owner_filter = format!("eq.{}", owner.id());
        let response = self
            .request(reqwest::Method::GET, HISTORY_TABLE)
            .query(&[
                ("select", "*"),
                (owner.column(), owner_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .header("Range-Unit", "items")
            .header("Range", format!("{offset}-{range_end}"))
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| AppError::storage("history query failed").with_source(e))?;

        if !response.status().is_success() {
            return Err(AppError::storage(format!(
                "history query returned {}",
                response.status()
            )));
        }

        let total_count = content_range_total(&response).unwrap_or(0);
        let items: Vec<HistoryRecord> = response
            .json()
            .await
            .map_err(|e| AppError::storage("malformed history rows").with_source(e))?;

        Ok(PagedResult::new(items, total_count, page_size))
    }

    async fn get_history_count(
        &self,
        owner: &HistoryOwner,
        mode: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u32> {
        let owner_filter = format!("eq.{}", owner.id());
        let mut request = self
            .request(reqwest::Method::GET, HISTORY_TABLE)
            .query(&[
                ("select", "id"),
                (owner.column(), owner_filter.as_str()),
            ])
            .header("Range-Unit", "items")
            .header("Range", "0-0")
            .header("Prefer", "count=exact");

        if let Some(mode) = mode {
            request = request.query(&[("mode", format!("eq.{mode}"))]);
        }
        if let Some(since) = since {
            request = request.query(&[("created_at", format!("gte.{}", since.to_rfc3339()))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::storage("history count failed").with_source(e))?;

        if !response.status().is_success() {
            return Err(AppError::storage(format!(
                "history count returned {}",
                response.status()
            )));
        }

        Ok(content_range_total(&response).unwrap_or(0))
    }

    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let id_filter = format!("eq.{user_id}");
        let response = self
            .request(reqwest::Method::GET, PROFILES_TABLE)
            .query(&[
                ("select", "id,username,avatar_url,updated_at"),
                ("id", id_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::storage("profile query failed").with_source(e))?;

        if !response.status().is_success() {
            return Err(AppError::storage(format!(
                "profile query returned {}",
                response.status()
            )));
        }

        let rows: Vec<UserProfile> = response
            .json()
            .await
            .map_err(|e| AppError::storage("malformed profile row").with_source(e))?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> AppResult<UserProfile> {
        let mut row = serde_json::json!({ "id": user_id });
        if let Some(username) = &update.username {
            row["username"] = serde_json::json!(username);
        }
        if let Some(avatar_url) = &update.avatar_url {
            row["avatar_url"] = serde_json::json!(avatar_url);
        }
        row["updated_at"] = serde_json::json!(Utc::now().to_rfc3339());

        let response = self
            .request(reqwest::Method::POST, PROFILES_TABLE)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| AppError::storage("profile upsert failed").with_source(e))?;

        if !response.status().is_success() {
            return Err(AppError::storage(format!(
                "profile upsert returned {}",
                response.status()
            )));
        }

        let rows: Vec<UserProfile> = response
            .json()
            .await
            .map_err(|e| AppError::storage("malformed profile row").with_source(e))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::storage("profile upsert returned no row"))
    }

    async fn get_subscription(&self, user_id: &str) -> AppResult<Option<Subscription>> {
        let id_filter = format!("eq.{user_id}");
        let response = self
            .request(reqwest::Method::GET, SUBSCRIPTIONS_TABLE)
            .query(&[
                (
                    "select",
                    "id,status,plan_id,current_period_start,current_period_end",
                ),
                ("id", id_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::storage("subscription query failed").with_source(e))?;

        if !response.status().is_success() {
            return Err(AppError::storage(format!(
                "subscription query returned {}",
                response.status()
            )));
        }

        let rows: Vec<Subscription> = response
            .json()
            .await
            .map_err(|e| AppError::storage("malformed subscription row").with_source(e))?;
        Ok(rows.into_iter().next())
    }
}

/// Total item count from a PostgREST `Content-Range` header (`0-9/57`)
fn content_range_total(response: &reqwest::Response) -> Option<u32> {
    response
        .headers()
        .get("content-range")?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_carries_exactly_one_identity() {
        let user = HistoryOwner::User("u-1".to_owned());
        assert_eq!(user.column(), "user_id");
        assert_eq!(user.user_type(), "user");
        assert_eq!(user.id(), "u-1");

        let session = HistoryOwner::Session("s-1".to_owned());
        assert_eq!(session.column(), "session_id");
        assert_eq!(session.user_type(), "anonymous");
    }

    #[test]
    fn test_unconfigured_store_is_a_config_error() {
        let result = SupabaseStore::new(SupabaseConfig {
            url: String::new(),
            anon_key: String::new(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_history_record_deserializes_postgrest_row() {
        let raw = r#"{
            "id": 42,
            "user_id": "u-1",
            "session_id": null,
            "original_prompt": "写一封邮件",
            "optimized_prompt": "optimized",
            "mode": "general",
            "user_type": "user",
            "created_at": "2025-06-01T12:00:00+00:00"
        }"#;
        let record: HistoryRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.mode, "general");
        assert!(record.session_id.is_none());
    }
}
