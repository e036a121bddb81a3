// ABOUTME: Model registry endpoint
// ABOUTME: Serves the static model table and the default model id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Model listing endpoint.

use super::AppState;
use crate::models::{ModelInfo, DEFAULT_MODEL, MODELS};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Model list response
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Supported models with display metadata
    pub models: &'static [ModelInfo],
    /// Model applied when a request names none
    pub default: &'static str,
}

/// Model registry routes
pub struct ModelRoutes;

impl ModelRoutes {
    /// Build the models router
    pub fn routes() -> Router<AppState> {
        Router::new().route("/api/models", get(list_models))
    }
}

async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: MODELS,
        default: DEFAULT_MODEL,
    })
}
