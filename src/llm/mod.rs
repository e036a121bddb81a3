// ABOUTME: Provider-agnostic chat completion types and the CompletionClient trait
// ABOUTME: One strict response type; presence and emptiness checks live in Completion::text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # LLM Client Abstraction
//!
//! Provider-agnostic types for chat completion calls plus the
//! [`CompletionClient`] trait the services depend on. The HTTP
//! implementation lives in [`client`]; tests substitute stubs.

pub mod client;

pub use client::HttpLlmClient;

use crate::errors::{AppError, ErrorCode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: MessageRole,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// System instruction message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Which credential pair a call must use.
///
/// The quick-answer path carries its own Gemini credentials; the two
/// lanes are never merged. Lane selection only matters for the Gemini
/// family; DeepSeek calls ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialLane {
    /// Credentials serving the optimization flows
    #[default]
    Primary,
    /// Dedicated quick-answer credentials
    Quick,
}

/// A chat completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Target model id
    pub model: String,
    /// Conversation messages in order
    pub messages: Vec<ChatMessage>,
    /// Token budget, always caller-supplied
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Credential lane
    pub lane: CredentialLane,
}

/// Why the upstream model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural completion
    Stop,
    /// Token budget exhausted
    Length,
    /// Anything else the provider reports
    Other,
}

impl FinishReason {
    /// Parse a provider finish-reason string
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            _ => Self::Other,
        }
    }
}

/// A completed upstream call.
///
/// Content may be absent or blank; every caller goes through [`text`]
/// so the presence and non-emptiness checks live in exactly one place.
///
/// [`text`]: Completion::text
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw content, if the provider returned any
    pub content: Option<String>,
    /// Finish reason, if reported
    pub finish_reason: Option<FinishReason>,
    /// Model that actually served the call (may differ after fallback)
    pub model: String,
}

impl Completion {
    /// Non-empty trimmed content, or [`LlmError::EmptyResponse`]
    ///
    /// # Errors
    ///
    /// Returns `EmptyResponse` naming the serving model when content is
    /// missing or whitespace-only.
    pub fn text(&self) -> Result<&str, LlmError> {
        match self.content.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(LlmError::EmptyResponse {
                model: self.model.clone(),
            }),
        }
    }
}

/// Upstream LLM failures, by cause.
///
/// Messages name the provider or model but never credential material.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for the required provider
    #[error("no API key configured for {provider}")]
    MissingCredentials {
        /// Provider display name
        provider: &'static str,
    },

    /// Upstream rejected the call for rate reasons
    #[error("{provider} rate limit exceeded")]
    RateLimited {
        /// Provider display name
        provider: &'static str,
    },

    /// Transport-level failure reaching the provider
    #[error("failed to reach {provider}: {message}")]
    Connection {
        /// Provider display name
        provider: &'static str,
        /// Transport diagnostic
        message: String,
    },

    /// The provider returned no usable content
    #[error("{model} returned an empty response")]
    EmptyResponse {
        /// Model that produced the empty completion
        model: String,
    },

    /// Any other provider-reported error
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        /// Provider display name
        provider: &'static str,
        /// HTTP status from the provider
        status: u16,
        /// Provider-reported message
        message: String,
    },
}

impl From<LlmError> for AppError {
    fn from(error: LlmError) -> Self {
        let code = match &error {
            LlmError::MissingCredentials { .. } => ErrorCode::ConfigError,
            LlmError::RateLimited { .. } => ErrorCode::ExternalRateLimited,
            LlmError::Api { status, .. } if *status == 401 || *status == 403 => {
                ErrorCode::ExternalAuthFailed
            }
            LlmError::Connection { .. } | LlmError::EmptyResponse { .. } | LlmError::Api { .. } => {
                ErrorCode::ExternalServiceError
            }
        };
        // Client payloads name the provider or model, never the raw
        // diagnostic; the full detail travels in `source` and reaches the
        // server logs through the response mapping.
        let message = match &error {
            LlmError::MissingCredentials { provider } => {
                format!("no API key configured for {provider}")
            }
            LlmError::RateLimited { provider } => format!("{provider} rate limit exceeded"),
            LlmError::Connection { provider, .. } => format!("failed to reach {provider}"),
            LlmError::EmptyResponse { model } => format!("{model} returned an empty response"),
            LlmError::Api { provider, status, .. } => {
                format!("{provider} API error (status {status})")
            }
        };
        Self::new(code, message).with_source(error)
    }
}

/// Seam between the orchestration services and the provider HTTP clients
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Execute one chat completion call
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] classifying the upstream failure.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
