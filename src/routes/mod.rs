// ABOUTME: HTTP route assembly and shared application state
// ABOUTME: Per-domain routers merged into one axum Router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # HTTP Surface
//!
//! Per-domain routers, each a struct with a `routes()` constructor,
//! merged in [`router`]. Handlers return `Result<_, AppError>` and stay
//! thin: identity extraction plus one service call.

pub mod health;
pub mod history;
pub mod models;
pub mod optimize;
pub mod quick_answer;
pub mod user;

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::services::{OptimizerService, QuickAnswerService};
use crate::store::{HistoryOwner, HistoryStore};
use axum::routing::get;
use axum::{Json, Router};
use http::HeaderMap;
use serde_json::json;
use std::sync::Arc;

/// Anonymous callers identify their browser session with this header
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
    /// JWT verifier
    pub auth: Arc<AuthManager>,
    /// Prompt orchestration service
    pub optimizer: Arc<OptimizerService>,
    /// Quick-answer service
    pub quick_answer: Arc<QuickAnswerService>,
    /// History/profile store, absent when Supabase is not configured
    pub store: Option<Arc<dyn HistoryStore>>,
}

impl AppState {
    /// The store, or a configuration error for endpoints that need it
    ///
    /// # Errors
    ///
    /// Returns a configuration error when Supabase is not configured.
    pub fn require_store(&self) -> crate::errors::AppResult<&Arc<dyn HistoryStore>> {
        self.store.as_ref().ok_or_else(|| {
            crate::errors::AppError::config(
                "storage is not configured: set SUPABASE_URL and SUPABASE_ANON_KEY",
            )
        })
    }

    /// Best-effort caller identity for history ownership.
    ///
    /// A valid bearer token wins; otherwise a non-empty `X-Session-Id`
    /// header names an anonymous session. No identity means history is
    /// skipped, never guessed.
    #[must_use]
    pub fn caller_identity(&self, headers: &HeaderMap) -> Option<HistoryOwner> {
        if let Some(user) = self.auth.authenticate_optional(headers) {
            return Some(HistoryOwner::User(user.user_id));
        }
        headers
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| HistoryOwner::Session(s.to_owned()))
    }
}

/// Assemble the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(health::HealthRoutes::routes())
        .merge(models::ModelRoutes::routes())
        .merge(optimize::OptimizeRoutes::routes())
        .merge(quick_answer::QuickAnswerRoutes::routes())
        .merge(history::HistoryRoutes::routes())
        .merge(user::UserRoutes::routes())
        .with_state(state)
}

/// Service banner
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "欢迎使用Promptwise提示词优化服务",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
