// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Builds an immutable ServerConfig once at startup, injected into every component
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Environment-based configuration management.
//!
//! The configuration is read exactly once in the server binary via
//! [`ServerConfig::from_env`], then shared by `Arc`. No component reads
//! environment variables at request time.

use anyhow::{Context, Result};
use std::env;

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default DeepSeek-compatible endpoint
const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default Gemini-compatible endpoint used by optimization flows
const DEFAULT_GEMINI_BASE_URL: &str = "https://www.chataiapi.com/v1";

/// Default Gemini endpoint used only by the quick-answer path
const DEFAULT_GEMINI_QUICK_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Supabase (history/profile store) configuration
    pub supabase: SupabaseConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Per-IP rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

/// JWT verification settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for HS256 token verification
    pub jwt_secret: String,
    /// Expected audience claim
    pub jwt_audience: String,
}

/// A single provider credential pair
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    /// API key (may be empty; the adapter fails loudly on use)
    pub api_key: String,
    /// OpenAI-compatible base URL
    pub base_url: String,
}

/// LLM provider settings
///
/// The Gemini family carries two independent credential pairs: `gemini`
/// serves the optimization flows, `gemini_quick` serves only the
/// quick-answer path. They are never merged.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// DeepSeek-compatible credentials
    pub deepseek: ProviderCredentials,
    /// Primary Gemini-compatible credentials
    pub gemini: ProviderCredentials,
    /// Quick-answer Gemini credentials
    pub gemini_quick: ProviderCredentials,
    /// Sampling temperature applied to all calls
    pub temperature: f32,
    /// Token budget for the standard optimize flow
    pub optimize_max_tokens: u32,
    /// Token budget for thinking-mode synthesis (long structured prompts)
    pub thinking_max_tokens: u32,
    /// Initial token budget for quick answers
    pub quick_answer_max_tokens: u32,
    /// Token budget for the single quick-answer truncation retry
    pub quick_answer_retry_max_tokens: u32,
}

/// Supabase REST store settings
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL (e.g. `https://xyz.supabase.co`)
    pub url: String,
    /// Anonymous API key
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Whether the store is configured at all
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

/// CORS settings
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated allowed origins, or "*" for any
    pub allowed_origins: String,
}

/// Per-IP token bucket settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is present but unparseable.
    pub fn from_env() -> Result<Self> {
        let http_port = parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)?;

        let auth = AuthConfig {
            jwt_secret: env_or_default("SUPABASE_JWT_SECRET", ""),
            jwt_audience: env_or_default("JWT_AUDIENCE", "authenticated"),
        };

        let llm = LlmConfig {
            deepseek: ProviderCredentials {
                api_key: env_or_default("DEEPSEEK_API_KEY", ""),
                base_url: env_or_default("DEEPSEEK_BASE_URL", DEFAULT_DEEPSEEK_BASE_URL),
            },
            gemini: ProviderCredentials {
                api_key: env_or_default("GEMINI_API_KEY", ""),
                base_url: env_or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            },
            gemini_quick: ProviderCredentials {
                api_key: env_or_default("GEMINI_QUICK_API_KEY", ""),
                base_url: env_or_default("GEMINI_QUICK_BASE_URL", DEFAULT_GEMINI_QUICK_BASE_URL),
            },
            temperature: parse_env("LLM_TEMPERATURE", 0.5)?,
            optimize_max_tokens: parse_env("OPTIMIZE_MAX_TOKENS", 2000)?,
            thinking_max_tokens: parse_env("THINKING_MAX_TOKENS", 8000)?,
            quick_answer_max_tokens: parse_env("QUICK_ANSWER_MAX_TOKENS", 16_384)?,
            quick_answer_retry_max_tokens: parse_env("QUICK_ANSWER_RETRY_MAX_TOKENS", 32_768)?,
        };

        let supabase = SupabaseConfig {
            url: env_or_default("SUPABASE_URL", ""),
            anon_key: env_or_default("SUPABASE_ANON_KEY", ""),
        };

        let cors = CorsConfig {
            allowed_origins: env_or_default("CORS_ALLOWED_ORIGINS", "*"),
        };

        let rate_limit = RateLimitConfig {
            requests: parse_env("RATE_LIMIT_REQUESTS", 10)?,
            window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 60)?,
        };

        Ok(Self {
            http_port,
            auth,
            llm,
            supabase,
            cors,
            rate_limit,
        })
    }

    /// One-line startup summary without secret material
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} deepseek_key={} gemini_key={} gemini_quick_key={} supabase={} rate_limit={}/{}s",
            self.http_port,
            presence(&self.llm.deepseek.api_key),
            presence(&self.llm.gemini.api_key),
            presence(&self.llm.gemini_quick.api_key),
            if self.supabase.is_configured() { "configured" } else { "absent" },
            self.rate_limit.requests,
            self.rate_limit.window_secs,
        )
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn presence(key: &str) -> &'static str {
    if key.is_empty() {
        "absent"
    } else {
        "set"
    }
}
