// ABOUTME: Liveness endpoint
// ABOUTME: No downstream checks; process-up means healthy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Health check endpoint.

use super::AppState;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Build the health router
    pub fn routes() -> Router<AppState> {
        Router::new().route("/api/health", get(health_check))
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
