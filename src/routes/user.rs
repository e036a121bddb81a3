// ABOUTME: Account endpoints: profile read/update and usage statistics
// ABOUTME: Strict-with-detail authentication; the subject claim must be non-empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! User profile and statistics endpoints.

use super::AppState;
use crate::errors::AppResult;
use crate::models::OptimizeMode;
use crate::pagination::PageParams;
use crate::store::{HistoryOwner, HistoryRecord, ProfileUpdate, Subscription, UserProfile};
use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use http::HeaderMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Profile response: identity claims plus the stored rows
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User id (JWT subject)
    pub user_id: String,
    /// Email from the token
    pub email: Option<String>,
    /// Stored profile, empty defaults when no row exists yet
    pub profile: UserProfile,
    /// Subscription, if any
    pub subscription: Option<Subscription>,
}

/// Usage statistics response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// All-time optimization count
    pub total_optimizations: u32,
    /// Optimizations in the last 7 days
    pub recent_7_days: u32,
    /// Per-mode counts, modes with zero omitted
    pub mode_statistics: BTreeMap<String, u32>,
    /// Most recent record, if any
    pub last_optimization: Option<HistoryRecord>,
}

/// User routes
pub struct UserRoutes;

impl UserRoutes {
    /// Build the user router
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/api/user/profile", get(get_profile))
            .route("/api/user/profile", put(update_profile))
            .route("/api/user/stats", get(get_stats))
    }
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.auth.authenticate_detailed(&headers)?;
    let store = state.require_store()?;

    let profile = store
        .get_profile(&user.user_id)
        .await?
        .unwrap_or_else(|| UserProfile {
            id: user.user_id.clone(),
            ..UserProfile::default()
        });
    let subscription = store.get_subscription(&user.user_id).await?;

    Ok(Json(ProfileResponse {
        user_id: user.user_id,
        email: user.email,
        profile,
        subscription,
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    let user = state.auth.authenticate_detailed(&headers)?;
    let store = state.require_store()?;

    let profile = store.update_profile(&user.user_id, &update).await?;
    Ok(Json(profile))
}

async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<StatsResponse>> {
    let user = state.auth.authenticate_detailed(&headers)?;
    let store = state.require_store()?;
    let owner = HistoryOwner::User(user.user_id);

    let total_optimizations = store.get_history_count(&owner, None, None).await?;
    let seven_days_ago = Utc::now() - Duration::days(7);
    let recent_7_days = store
        .get_history_count(&owner, None, Some(seven_days_ago))
        .await?;

    let mut mode_statistics = BTreeMap::new();
    for mode in [
        OptimizeMode::General,
        OptimizeMode::Business,
        OptimizeMode::Drawing,
        OptimizeMode::Academic,
        OptimizeMode::Thinking,
        OptimizeMode::Expert,
    ] {
        let count = store
            .get_history_count(&owner, Some(mode.as_str()), None)
            .await?;
        if count > 0 {
            mode_statistics.insert(mode.as_str().to_owned(), count);
        }
    }

    let last_optimization = store
        .get_history(
            &owner,
            PageParams {
                page: Some(1),
                page_size: Some(1),
            },
        )
        .await?
        .items
        .into_iter()
        .next();

    Ok(Json(StatsResponse {
        total_optimizations,
        recent_7_days,
        mode_statistics,
        last_optimization,
    }))
}
