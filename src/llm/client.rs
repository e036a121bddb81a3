// ABOUTME: OpenAI-compatible HTTP client with family dispatch and credential lanes
// ABOUTME: Carries the one-shot fallback for the flaky Gemini preview model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # HTTP LLM Client
//!
//! One client covers every provider: all upstreams speak the
//! OpenAI-compatible `/chat/completions` shape and differ only in base
//! URL and API key. The model id's family prefix picks the credential
//! pair; the [`CredentialLane`] picks between the two Gemini pairs.

use super::{
    ChatMessage, Completion, CompletionClient, CompletionRequest, CredentialLane, FinishReason,
    LlmError,
};
use crate::config::{LlmConfig, ProviderCredentials};
use crate::models::{self, ModelFamily, FLAKY_GEMINI_MODEL, GEMINI_FALLBACK_MODEL};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    #[serde(default)]
    error: Option<WireErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Production [`CompletionClient`] backed by `reqwest`
pub struct HttpLlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    /// Build a client with one shared connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Connection {
                provider: "http",
                message: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    fn credentials_for(
        &self,
        family: ModelFamily,
        lane: CredentialLane,
    ) -> Result<(&ProviderCredentials, &'static str), LlmError> {
        let (credentials, provider) = match (family, lane) {
            (ModelFamily::DeepSeek, _) => (&self.config.deepseek, "DeepSeek"),
            (ModelFamily::Gemini, CredentialLane::Primary) => (&self.config.gemini, "Gemini"),
            (ModelFamily::Gemini, CredentialLane::Quick) => {
                (&self.config.gemini_quick, "Gemini (quick)")
            }
        };
        if credentials.api_key.is_empty() {
            return Err(LlmError::MissingCredentials { provider });
        }
        Ok((credentials, provider))
    }

    async fn call_once(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<Completion, LlmError> {
        let (credentials, provider) =
            self.credentials_for(models::family_of(model), request.lane)?;

        let url = format!("{}/chat/completions", credentials.base_url);
        let body = WireRequest {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(model, provider, max_tokens = request.max_tokens, "llm call");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&credentials.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Connection {
                provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(parse_error_response(provider, status.as_u16(), &raw));
        }

        let parsed: WireResponse =
            response.json().await.map_err(|e| LlmError::Connection {
                provider,
                message: format!("malformed response body: {e}"),
            })?;

        let choice = parsed.choices.into_iter().next();
        Ok(Completion {
            content: choice.as_ref().and_then(|c| c.message.content.clone()),
            finish_reason: choice
                .and_then(|c| c.finish_reason)
                .map(|r| FinishReason::parse(&r)),
            model: model.to_owned(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let completion = self.call_once(&request.model, request).await?;

        // One known-flaky Gemini preview intermittently answers with
        // nothing; retry exactly once against the stable flash model.
        if completion.text().is_err() && request.model == FLAKY_GEMINI_MODEL {
            tracing::warn!(
                model = FLAKY_GEMINI_MODEL,
                fallback = GEMINI_FALLBACK_MODEL,
                "empty completion, retrying with fallback model"
            );
            return self.call_once(GEMINI_FALLBACK_MODEL, request).await;
        }

        Ok(completion)
    }
}

/// Map a non-success provider response to an [`LlmError`]
fn parse_error_response(provider: &'static str, status: u16, raw_body: &str) -> LlmError {
    if status == 429 {
        return LlmError::RateLimited { provider };
    }

    let message = serde_json::from_str::<WireErrorBody>(raw_body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            let trimmed = raw_body.trim();
            if trimmed.is_empty() {
                "no error detail".to_owned()
            } else {
                trimmed.chars().take(200).collect()
            }
        });

    LlmError::Api {
        provider,
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn stub_config(base_url: &str) -> LlmConfig {
        let credentials = |key: &str| ProviderCredentials {
            api_key: key.to_owned(),
            base_url: base_url.to_owned(),
        };
        LlmConfig {
            deepseek: credentials("deepseek-key"),
            gemini: credentials("gemini-primary-key"),
            gemini_quick: credentials("gemini-quick-key"),
            temperature: 0.5,
            optimize_max_tokens: 2000,
            thinking_max_tokens: 8000,
            quick_answer_max_tokens: 16_384,
            quick_answer_retry_max_tokens: 32_768,
        }
    }

    /// Local `/chat/completions` stub recording (model, authorization)
    /// pairs. Answers empty content for the flaky preview model and real
    /// content for everything else.
    async fn spawn_stub_upstream() -> (String, Arc<Mutex<Vec<(String, String)>>>) {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = axum::Router::new().route(
            "/chat/completions",
            axum::routing::post(
                move |headers: http::HeaderMap,
                      axum::Json(body): axum::Json<serde_json::Value>| {
                    let recorder = recorder.clone();
                    async move {
                        let model = body["model"].as_str().unwrap_or_default().to_owned();
                        let auth = headers
                            .get(http::header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_owned();
                        let content = if model == FLAKY_GEMINI_MODEL {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::String("补回的完整回答。".to_owned())
                        };
                        recorder.lock().unwrap().push((model, auth));
                        axum::Json(serde_json::json!({
                            "choices": [{
                                "message": {"content": content},
                                "finish_reason": "stop"
                            }]
                        }))
                    }
                },
            ),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn test_flaky_model_falls_back_once_and_keeps_credentials() {
        let (base_url, seen) = spawn_stub_upstream().await;
        let client = HttpLlmClient::new(stub_config(&base_url)).unwrap();

        let request = CompletionRequest {
            model: FLAKY_GEMINI_MODEL.to_owned(),
            messages: vec![ChatMessage::user("如何定价？")],
            max_tokens: 100,
            temperature: 0.5,
            lane: CredentialLane::Primary,
        };
        let completion = client.complete(&request).await.unwrap();

        assert_eq!(completion.model, GEMINI_FALLBACK_MODEL);
        assert_eq!(completion.text().unwrap(), "补回的完整回答。");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, FLAKY_GEMINI_MODEL);
        assert_eq!(seen[1].0, GEMINI_FALLBACK_MODEL);
        // Both calls stay on the primary Gemini credential pair
        assert!(seen
            .iter()
            .all(|(_, auth)| auth == "Bearer gemini-primary-key"));
    }

    #[tokio::test]
    async fn test_stable_model_is_not_retried() {
        let (base_url, seen) = spawn_stub_upstream().await;
        let client = HttpLlmClient::new(stub_config(&base_url)).unwrap();

        let request = CompletionRequest {
            model: GEMINI_FALLBACK_MODEL.to_owned(),
            messages: vec![ChatMessage::user("问题")],
            max_tokens: 100,
            temperature: 0.5,
            lane: CredentialLane::Primary,
        };
        let completion = client.complete(&request).await.unwrap();

        assert_eq!(completion.model, GEMINI_FALLBACK_MODEL);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rate_limit_status_wins_over_body() {
        let err = parse_error_response("Gemini", 429, r#"{"error":{"message":"slow down"}}"#);
        assert!(matches!(err, LlmError::RateLimited { provider: "Gemini" }));
    }

    #[test]
    fn test_structured_error_message_is_extracted() {
        let err = parse_error_response("DeepSeek", 400, r#"{"error":{"message":"bad model"}}"#);
        match err {
            LlmError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad model");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unstructured_error_body_is_clipped() {
        let long_body = "x".repeat(1000);
        let err = parse_error_response("Gemini", 500, &long_body);
        match err {
            LlmError::Api { message, .. } => assert_eq!(message.chars().count(), 200),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_error_body_gets_placeholder() {
        let err = parse_error_response("Gemini", 502, "");
        match err {
            LlmError::Api { message, .. } => assert_eq!(message, "no error detail"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_credentials_by_lane() {
        let config = LlmConfig {
            deepseek: ProviderCredentials {
                api_key: "sk-test".to_owned(),
                base_url: "https://api.deepseek.com/v1".to_owned(),
            },
            gemini: ProviderCredentials {
                api_key: String::new(),
                base_url: "https://example.com/v1".to_owned(),
            },
            gemini_quick: ProviderCredentials {
                api_key: "quick-key".to_owned(),
                base_url: "https://example.com/v1beta/openai".to_owned(),
            },
            temperature: 0.5,
            optimize_max_tokens: 2000,
            thinking_max_tokens: 8000,
            quick_answer_max_tokens: 16_384,
            quick_answer_retry_max_tokens: 32_768,
        };
        let client = HttpLlmClient::new(config).unwrap();

        assert!(client
            .credentials_for(ModelFamily::DeepSeek, CredentialLane::Primary)
            .is_ok());
        assert!(matches!(
            client.credentials_for(ModelFamily::Gemini, CredentialLane::Primary),
            Err(LlmError::MissingCredentials { provider: "Gemini" })
        ));
        assert!(client
            .credentials_for(ModelFamily::Gemini, CredentialLane::Quick)
            .is_ok());
    }
}
