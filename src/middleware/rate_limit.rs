// ABOUTME: Per-IP fixed-window rate limiting over a dashmap bucket table
// ABOUTME: Every response carries X-RateLimit headers; 429s add Retry-After
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Per-IP rate limiting middleware.

use crate::config::RateLimitConfig;
use crate::errors::{AppError, ErrorCode};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use http::{HeaderName, HeaderValue};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";
const RETRY_AFTER_HEADER: &str = "retry-after";

struct Bucket {
    window_start: Instant,
    count: u32,
}

/// Outcome of one rate-limit check
struct Decision {
    allowed: bool,
    remaining: u32,
    reset_secs: u64,
}

/// Fixed-window request counter keyed by client address
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Build a limiter from configuration
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let window_secs = self.config.window_secs;
        let limit = self.config.requests;

        let mut bucket = self.buckets.entry(key.to_owned()).or_insert_with(|| Bucket {
            window_start: now,
            count: 0,
        });

        let elapsed = now.duration_since(bucket.window_start).as_secs();
        if elapsed >= window_secs {
            bucket.window_start = now;
            bucket.count = 0;
        }

        let reset_secs = window_secs.saturating_sub(
            now.duration_since(bucket.window_start).as_secs(),
        );

        if bucket.count < limit {
            bucket.count += 1;
            Decision {
                allowed: true,
                remaining: limit - bucket.count,
                reset_secs,
            }
        } else {
            Decision {
                allowed: false,
                remaining: 0,
                reset_secs,
            }
        }
    }
}

/// Client key: forwarded header first, then the socket address
fn client_key(request: &Request) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = request.headers().get(header).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next().map(str::trim) {
                if !first.is_empty() {
                    return first.to_owned();
                }
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |info| info.0.ip().to_string())
}

/// Middleware enforcing the per-IP request budget
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    let decision = limiter.check(&key);
    let limit = limiter.config.requests;

    if !decision.allowed {
        tracing::debug!(client = %key, "rate limit exceeded");
        let mut response = AppError::new(
            ErrorCode::RateLimitExceeded,
            "Too many requests, please slow down",
        )
        .into_response();
        append_limit_headers(&mut response, limit, &decision);
        response.headers_mut().insert(
            HeaderName::from_static(RETRY_AFTER_HEADER),
            HeaderValue::from(decision.reset_secs),
        );
        return response;
    }

    let mut response = next.run(request).await;
    append_limit_headers(&mut response, limit, &decision);
    response
}

fn append_limit_headers(response: &mut Response, limit: u32, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(LIMIT_HEADER),
        HeaderValue::from(limit),
    );
    headers.insert(
        HeaderName::from_static(REMAINING_HEADER),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static(RESET_HEADER),
        HeaderValue::from(decision.reset_secs),
    );
}
