// ABOUTME: Library crate root for the Promptwise prompt-optimization backend
// ABOUTME: Wires templates, model registry, LLM adapter, services, store, auth and routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Promptwise
//!
//! Backend service that rewrites raw user prompts into structured
//! meta-prompts via mode-specific templates, forwards them to
//! OpenAI-compatible LLM providers, and persists optimization history in
//! Supabase. The `promptwise-server` binary assembles the axum router
//! over this library.
//!
//! Layer order, bottom up: pure helpers ([`templates`], [`models`],
//! [`recovery`], [`truncation`], [`pagination`]), then adapters
//! ([`llm`], [`store`], [`auth`]), then [`services`], then [`routes`]
//! and [`middleware`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod auth;
pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod recovery;
pub mod routes;
pub mod services;
pub mod store;
pub mod templates;
pub mod truncation;
