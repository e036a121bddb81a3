// ABOUTME: CORS layer construction from configuration
// ABOUTME: Wildcard allows any origin; otherwise a comma-separated allowlist
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! CORS configuration.

use crate::config::CorsConfig;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer from configuration.
///
/// Origins that fail to parse are dropped with a warning rather than
/// aborting startup.
#[must_use]
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if config.allowed_origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_and_list_both_build() {
        cors_layer(&CorsConfig {
            allowed_origins: "*".to_owned(),
        });
        cors_layer(&CorsConfig {
            allowed_origins: "https://app.example.com, https://staging.example.com".to_owned(),
        });
        cors_layer(&CorsConfig {
            allowed_origins: "https://ok.example.com, \u{7834}\u{574f}".to_owned(),
        });
    }
}
