// ABOUTME: Cross-cutting HTTP middleware: CORS and per-IP rate limiting
// ABOUTME: Request tracing is layered directly in the server binary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! HTTP middleware layers.

pub mod cors;
pub mod rate_limit;

pub use cors::cors_layer;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
