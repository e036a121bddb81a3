// ABOUTME: Direct long-form answer generation with truncation detection and one retry
// ABOUTME: Runs on the dedicated quick-answer credential lane
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Quick Answer
//!
//! Answers the user's prompt directly instead of optimizing it. The
//! word-count guidance lives in the prompt template; the only
//! programmatic enforcement is the truncation heuristic with its single
//! higher-budget retry, plus a hard character ceiling.
//!
//! The `thinking_process` field is a synthetic status string, not a
//! chain-of-thought capture.

use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::{
    ChatMessage, Completion, CompletionClient, CompletionRequest, CredentialLane, FinishReason,
};
use crate::services::optimizer::OptimizerService;
use crate::templates;
use crate::truncation::{cut_at_sentence_boundary, is_possibly_truncated};
use serde::Serialize;
use std::sync::Arc;

/// Hard ceiling on answer length, in characters
const ANSWER_CEILING_CHARS: usize = 40_000;

/// A generated quick answer
#[derive(Debug, Clone, Serialize)]
pub struct QuickAnswer {
    /// Always `true` on a served answer; failures surface as errors
    pub success: bool,
    /// Synthetic status string shown in the UI
    pub thinking_process: String,
    /// The answer text
    pub final_answer: String,
    /// Model that served the call
    pub model_used: String,
}

/// Generates direct answers over the quick credential lane
pub struct QuickAnswerService {
    client: Arc<dyn CompletionClient>,
    llm: LlmConfig,
}

impl QuickAnswerService {
    /// Build a service over a completion client
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, llm: LlmConfig) -> Self {
        Self { client, llm }
    }

    async fn call(&self, model: &str, prompt: &str, max_tokens: u32) -> AppResult<Completion> {
        let rendered = templates::render(templates::QUICK_ANSWER_TEMPLATE, prompt)?;
        let request = CompletionRequest {
            model: model.to_owned(),
            messages: vec![ChatMessage::user(rendered)],
            max_tokens,
            temperature: self.llm.temperature,
            lane: CredentialLane::Quick,
        };
        self.client.complete(&request).await.map_err(AppError::from)
    }

    /// Generate a long-form answer, retrying once on suspected truncation
    ///
    /// # Errors
    ///
    /// Validation errors for blank prompts or unsupported models;
    /// upstream failures mapped through the `LlmError` taxonomy.
    pub async fn generate_answer(&self, prompt: &str, model: &str) -> AppResult<QuickAnswer> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::invalid_input("prompt must not be empty"));
        }
        OptimizerService::validate_model(model)?;

        let first = self
            .call(model, prompt, self.llm.quick_answer_max_tokens)
            .await?;
        let first_text = first.text().map_err(AppError::from)?.to_owned();

        let flagged = is_possibly_truncated(&first_text);
        let stopped_normally = first.finish_reason == Some(FinishReason::Stop);

        let answer = if flagged && !stopped_normally {
            tracing::info!(
                model,
                chars = first_text.chars().count(),
                "answer looks truncated, retrying at higher budget"
            );
            match self
                .call(model, prompt, self.llm.quick_answer_retry_max_tokens)
                .await
                .and_then(|c| c.text().map(str::to_owned).map_err(AppError::from))
            {
                Ok(second_text) => pick_candidate(first_text, second_text),
                Err(e) => {
                    // One retry only; a failed retry keeps the first answer
                    tracing::warn!("truncation retry failed, keeping first answer: {e}");
                    first_text
                }
            }
        } else {
            first_text
        };

        let final_answer = cut_at_sentence_boundary(&answer, ANSWER_CEILING_CHARS);
        let char_count = final_answer.chars().count();

        Ok(QuickAnswer {
            success: true,
            thinking_process: format!("✅ AI分析完成（字数：{char_count}）"),
            final_answer,
            model_used: first.model,
        })
    }
}

/// Keep the non-flagged candidate, else the longer one
fn pick_candidate(first: String, second: String) -> String {
    match (is_possibly_truncated(&first), is_possibly_truncated(&second)) {
        (true, false) => second,
        (false, true) => first,
        _ => {
            if second.chars().count() > first.chars().count() {
                second
            } else {
                first
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredentials;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubClient {
        responses: Mutex<Vec<Completion>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl StubClient {
        fn new(responses: Vec<Completion>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.lock().unwrap().push(request.clone());
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn llm_config() -> LlmConfig {
        LlmConfig {
            deepseek: ProviderCredentials {
                api_key: "k".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            gemini: ProviderCredentials {
                api_key: "k".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            gemini_quick: ProviderCredentials {
                api_key: "k".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            temperature: 0.5,
            optimize_max_tokens: 2000,
            thinking_max_tokens: 8000,
            quick_answer_max_tokens: 16_384,
            quick_answer_retry_max_tokens: 32_768,
        }
    }

    fn completion(content: &str, finish: FinishReason) -> Completion {
        Completion {
            content: Some(content.to_owned()),
            finish_reason: Some(finish),
            model: "deepseek-chat".to_owned(),
        }
    }

    fn complete_answer() -> String {
        let mut s = "这是对问题的完整分析，涵盖了背景、原因与对策三个层面。".repeat(4);
        s.push_str("综上所述，建议按步骤推进即可。");
        s
    }

    fn truncated_answer() -> String {
        "这是一个被截断的回答，内容已经展开了一部分，涵盖了背景与原因，但是在关键的对策部分突然停在了，".to_owned()
    }

    #[tokio::test]
    async fn test_complete_answer_needs_no_retry() {
        let client = Arc::new(StubClient::new(vec![completion(
            &complete_answer(),
            FinishReason::Stop,
        )]));
        let svc = QuickAnswerService::new(client.clone(), llm_config());

        let answer = svc.generate_answer("如何定价？", "deepseek-chat").await.unwrap();
        assert_eq!(client.calls.lock().unwrap().len(), 1);
        assert!(answer.success);
        assert!(answer.thinking_process.contains("字数"));
        assert_eq!(answer.model_used, "deepseek-chat");
    }

    #[tokio::test]
    async fn test_truncated_answer_triggers_one_retry() {
        let client = Arc::new(StubClient::new(vec![
            completion(&truncated_answer(), FinishReason::Length),
            completion(&complete_answer(), FinishReason::Stop),
        ]));
        let svc = QuickAnswerService::new(client.clone(), llm_config());

        let answer = svc.generate_answer("如何定价？", "deepseek-chat").await.unwrap();
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].max_tokens, 16_384);
        assert_eq!(calls[1].max_tokens, 32_768);
        assert_eq!(answer.final_answer, complete_answer());
    }

    #[tokio::test]
    async fn test_flagged_but_stopped_normally_is_kept() {
        // Heuristic false positive: a dangling ending with a normal stop
        let client = Arc::new(StubClient::new(vec![completion(
            &truncated_answer(),
            FinishReason::Stop,
        )]));
        let svc = QuickAnswerService::new(client.clone(), llm_config());

        svc.generate_answer("如何定价？", "deepseek-chat").await.unwrap();
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected() {
        let client = Arc::new(StubClient::new(vec![]));
        let svc = QuickAnswerService::new(client, llm_config());
        let err = svc.generate_answer("   ", "deepseek-chat").await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_quick_lane_is_used() {
        let client = Arc::new(StubClient::new(vec![completion(
            &complete_answer(),
            FinishReason::Stop,
        )]));
        let svc = QuickAnswerService::new(client.clone(), llm_config());

        svc.generate_answer("问题", "gemini-2.0-flash").await.unwrap();
        assert_eq!(client.calls.lock().unwrap()[0].lane, CredentialLane::Quick);
    }

    #[test]
    fn test_pick_candidate_prefers_unflagged() {
        assert_eq!(
            pick_candidate(truncated_answer(), complete_answer()),
            complete_answer()
        );
        assert_eq!(
            pick_candidate(complete_answer(), truncated_answer()),
            complete_answer()
        );
    }

    #[test]
    fn test_pick_candidate_falls_back_to_longer() {
        let short = truncated_answer();
        let mut long = truncated_answer();
        long.push_str("继续生成的更多内容，但仍然停在了，");
        assert_eq!(pick_candidate(short, long.clone()), long);
    }
}
