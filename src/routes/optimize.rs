// ABOUTME: Optimization endpoints: plain optimize, expert interview and thinking flows
// ABOUTME: Handlers extract identity, default the model, and delegate to the optimizer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Prompt optimization endpoints.
//!
//! All of these use the optional authentication policy: an anonymous
//! caller still gets an optimization, they just may not get history.

use super::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::{DEFAULT_MODEL, OptimizeMode};
use crate::services::optimizer::{AnalysisQuestion, AnalysisResult, OptimizeOutcome};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest prompt accepted by any optimization endpoint, in characters
const MAX_PROMPT_CHARS: usize = 20_000;

// ============================================================================
// Wire types
// ============================================================================

/// Plain optimize request
#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    /// Prompt to optimize
    pub original_prompt: String,
    /// Target model, defaulting to the registry default
    #[serde(default)]
    pub model: Option<String>,
    /// Optimization mode, defaulting to `general` (unknown values too)
    #[serde(default)]
    pub mode: Option<String>,
}

/// Expert interview analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// The rough idea to analyze
    pub original_idea: String,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Expert interview synthesize request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    /// The rough idea from the analyze stage
    pub original_idea: String,
    /// Answers keyed by question key
    #[serde(default)]
    pub user_answers: BTreeMap<String, String>,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Thinking-flow analyze request
#[derive(Debug, Deserialize)]
pub struct ThinkingAnalyzeRequest {
    /// Prompt to think about
    pub original_prompt: String,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Thinking-flow analyze response
#[derive(Debug, Serialize)]
pub struct ThinkingAnalyzeResponse {
    /// Probing questions for the user
    pub analysis_result: Vec<AnalysisQuestion>,
}

/// Thinking-flow optimize request
#[derive(Debug, Deserialize)]
pub struct ThinkingOptimizeRequest {
    /// Prompt from the analyze stage
    pub original_prompt: String,
    /// Collected answers keyed by question key
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Quick-option generation request
#[derive(Debug, Deserialize)]
pub struct QuickOptionsRequest {
    /// Key of the field the question belongs to
    pub field_key: String,
    /// The clarification question
    pub question: String,
    /// Target model
    #[serde(default)]
    pub model: Option<String>,
}

/// Quick-option generation response
#[derive(Debug, Serialize)]
pub struct QuickOptionsResponse {
    /// 3-5 quick-pick answers
    pub options: Vec<String>,
}

// ============================================================================
// Routes
// ============================================================================

/// Optimization routes
pub struct OptimizeRoutes;

impl OptimizeRoutes {
    /// Build the optimization router
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/api/optimize", post(optimize))
            .route("/api/analyze", post(analyze))
            .route("/api/synthesize", post(synthesize))
            .route("/api/thinking/analyze", post(thinking_analyze))
            .route("/api/thinking/optimize", post(thinking_optimize))
            .route("/api/generate-quick-options", post(generate_quick_options))
    }
}

fn model_or_default(model: Option<&str>) -> &str {
    match model {
        Some(m) if !m.trim().is_empty() => m,
        _ => DEFAULT_MODEL,
    }
}

fn validate_prompt(prompt: &str) -> AppResult<()> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("prompt must not be empty"));
    }
    if trimmed.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::invalid_input(format!(
            "prompt exceeds the {MAX_PROMPT_CHARS} character limit"
        )));
    }
    Ok(())
}

async fn optimize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OptimizeRequest>,
) -> AppResult<Json<OptimizeOutcome>> {
    validate_prompt(&request.original_prompt)?;
    let model = model_or_default(request.model.as_deref());
    let mode = OptimizeMode::from_str_or_general(request.mode.as_deref().unwrap_or("general"));
    let owner = state.caller_identity(&headers);

    let outcome = state
        .optimizer
        .optimize(request.original_prompt.trim(), model, mode, owner.as_ref())
        .await?;
    Ok(Json(outcome))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalysisResult>> {
    validate_prompt(&request.original_idea)?;
    let model = model_or_default(request.model.as_deref());

    let result = state
        .optimizer
        .analyze_idea(request.original_idea.trim(), model)
        .await?;
    Ok(Json(result))
}

async fn synthesize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SynthesizeRequest>,
) -> AppResult<Json<OptimizeOutcome>> {
    validate_prompt(&request.original_idea)?;
    let model = model_or_default(request.model.as_deref());
    let owner = state.caller_identity(&headers);

    let outcome = state
        .optimizer
        .synthesize_prompt(
            request.original_idea.trim(),
            &request.user_answers,
            model,
            owner.as_ref(),
        )
        .await?;
    Ok(Json(outcome))
}

async fn thinking_analyze(
    State(state): State<AppState>,
    Json(request): Json<ThinkingAnalyzeRequest>,
) -> AppResult<Json<ThinkingAnalyzeResponse>> {
    validate_prompt(&request.original_prompt)?;
    let model = model_or_default(request.model.as_deref());

    let analysis_result = state
        .optimizer
        .analyze_thinking_prompt(request.original_prompt.trim(), model)
        .await?;
    Ok(Json(ThinkingAnalyzeResponse { analysis_result }))
}

async fn thinking_optimize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ThinkingOptimizeRequest>,
) -> AppResult<Json<OptimizeOutcome>> {
    validate_prompt(&request.original_prompt)?;
    let model = model_or_default(request.model.as_deref());
    let owner = state.caller_identity(&headers);

    let outcome = state
        .optimizer
        .optimize_thinking_prompt(
            request.original_prompt.trim(),
            &request.additional_info,
            model,
            owner.as_ref(),
        )
        .await?;
    Ok(Json(outcome))
}

async fn generate_quick_options(
    State(state): State<AppState>,
    Json(request): Json<QuickOptionsRequest>,
) -> AppResult<Json<QuickOptionsResponse>> {
    if request.question.trim().is_empty() {
        return Err(AppError::invalid_input("question must not be empty"));
    }
    let model = model_or_default(request.model.as_deref());

    let options = state
        .optimizer
        .generate_quick_options(&request.field_key, request.question.trim(), model)
        .await;
    Ok(Json(QuickOptionsResponse { options }))
}
