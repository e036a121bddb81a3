// ABOUTME: Server binary: config, logging, component wiring and the axum listener
// ABOUTME: Supabase and provider keys are optional; missing pieces degrade with a warning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Promptwise HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use promptwise::auth::AuthManager;
use promptwise::config::ServerConfig;
use promptwise::llm::HttpLlmClient;
use promptwise::logging;
use promptwise::middleware::{cors_layer, rate_limit_middleware, RateLimiter};
use promptwise::routes::{self, AppState};
use promptwise::services::{OptimizerService, QuickAnswerService};
use promptwise::store::{HistoryStore, SupabaseStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Prompt optimization backend server
#[derive(Parser)]
#[command(name = "promptwise-server", version, about)]
struct Args {
    /// HTTP listen port (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    let config = Arc::new(config);

    tracing::info!("starting promptwise-server: {}", config.summary());

    let client = Arc::new(
        HttpLlmClient::new(config.llm.clone()).context("failed to build the LLM client")?,
    );

    let store: Option<Arc<dyn HistoryStore>> = if config.supabase.is_configured() {
        let supabase = SupabaseStore::new(config.supabase.clone())
            .context("failed to build the Supabase store")?;
        Some(Arc::new(supabase))
    } else {
        tracing::warn!("Supabase is not configured; history and profile endpoints are disabled");
        None
    };

    let optimizer = Arc::new(OptimizerService::new(
        client.clone(),
        store.clone(),
        config.llm.clone(),
    ));
    let quick_answer = Arc::new(QuickAnswerService::new(client, config.llm.clone()));

    let state = AppState {
        config: config.clone(),
        auth: Arc::new(AuthManager::new(&config.auth)),
        optimizer,
        quick_answer,
        store,
    };

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let app = routes::router(state)
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
}
