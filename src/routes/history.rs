// ABOUTME: Paginated optimization history endpoint with total-count headers
// ABOUTME: Strict authentication; anonymous sessions have no history surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! History listing endpoint.

use super::AppState;
use crate::errors::AppResult;
use crate::pagination::PageParams;
use crate::store::{HistoryOwner, HistoryRecord};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// Header carrying the total matching record count
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Header carrying the total page count at the requested page size
pub const TOTAL_PAGES_HEADER: &str = "x-total-pages";

/// History page response body
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Records on this page, newest first
    pub history: Vec<HistoryRecord>,
    /// Total records across all pages
    pub total: u32,
    /// Total pages at the requested page size
    pub total_pages: u32,
}

/// History routes
pub struct HistoryRoutes;

impl HistoryRoutes {
    /// Build the history router
    pub fn routes() -> Router<AppState> {
        Router::new().route("/api/history", get(get_history))
    }
}

async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> AppResult<(HeaderMap, Json<HistoryResponse>)> {
    let user = state.auth.authenticate(&headers)?;
    let store = state.require_store()?;

    let owner = HistoryOwner::User(user.user_id);
    let result = store.get_history(&owner, page).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        HeaderName::from_static(TOTAL_COUNT_HEADER),
        HeaderValue::from(result.total_count),
    );
    response_headers.insert(
        HeaderName::from_static(TOTAL_PAGES_HEADER),
        HeaderValue::from(result.total_pages),
    );

    Ok((
        response_headers,
        Json(HistoryResponse {
            history: result.items,
            total: result.total_count,
            total_pages: result.total_pages,
        }),
    ))
}
