// ABOUTME: Direct long-form answer endpoint
// ABOUTME: Thin wrapper over the quick-answer service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Quick-answer endpoint.

use super::AppState;
use crate::errors::AppResult;
use crate::models::DEFAULT_MODEL;
use crate::services::QuickAnswer;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

/// Quick-answer request
#[derive(Debug, Deserialize)]
pub struct QuickAnswerRequest {
    /// Question or prompt to answer directly
    pub prompt: String,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Quick-answer routes
pub struct QuickAnswerRoutes;

impl QuickAnswerRoutes {
    /// Build the quick-answer router
    pub fn routes() -> Router<AppState> {
        Router::new().route("/api/quick-answer", post(quick_answer))
    }
}

async fn quick_answer(
    State(state): State<AppState>,
    Json(request): Json<QuickAnswerRequest>,
) -> AppResult<Json<QuickAnswer>> {
    let model = match request.model.as_deref() {
        Some(m) if !m.trim().is_empty() => m.to_owned(),
        _ => DEFAULT_MODEL.to_owned(),
    };

    let answer = state
        .quick_answer
        .generate_answer(&request.prompt, &model)
        .await?;
    Ok(Json(answer))
}
