// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Configures log levels and output formats via environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Production logging configuration with structured output.

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl LogFormat {
    /// Read the format from the `LOG_FORMAT` environment variable
    #[must_use]
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            Ok("compact") => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber from environment variables
///
/// Respects `RUST_LOG` for filtering (default `info`) and `LOG_FORMAT`
/// for the output format.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_from_env() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    match LogFormat::from_env() {
        LogFormat::Json => builder.json().try_init().map_err(|e| anyhow::anyhow!(e))?,
        LogFormat::Compact => builder
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?,
        LogFormat::Pretty => builder.try_init().map_err(|e| anyhow::anyhow!(e))?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_pretty() {
        // Only meaningful when LOG_FORMAT is unset in the test environment
        if env::var("LOG_FORMAT").is_err() {
            assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
        }
    }
}
