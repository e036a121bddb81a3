// ABOUTME: Shared test fixtures: stub LLM client, in-memory store, state builder
// ABOUTME: Used by the HTTP integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use promptwise::auth::{AuthManager, Claims};
use promptwise::config::{
    AuthConfig, CorsConfig, LlmConfig, ProviderCredentials, RateLimitConfig, ServerConfig,
    SupabaseConfig,
};
use promptwise::errors::AppResult;
use promptwise::llm::{Completion, CompletionClient, CompletionRequest, FinishReason, LlmError};
use promptwise::pagination::{PagedResult, PageParams};
use promptwise::routes::AppState;
use promptwise::services::{OptimizerService, QuickAnswerService};
use promptwise::store::{
    HistoryOwner, HistoryRecord, HistoryStore, ProfileUpdate, Subscription, UserProfile,
};
use std::sync::{Arc, Mutex};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Stub completion client serving canned responses in order; the last
/// response repeats once the queue drains.
pub struct StubClient {
    responses: Mutex<Vec<Result<String, LlmError>>>,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl StubClient {
    pub fn returning(content: &str) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(vec![Ok(content.to_owned())]),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_responses(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(vec![Err(LlmError::Connection {
                provider: "DeepSeek",
                message: "connection refused".to_owned(),
            })]),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            match &responses[0] {
                Ok(content) => Ok(content.clone()),
                Err(_) => Err(LlmError::Connection {
                    provider: "DeepSeek",
                    message: "connection refused".to_owned(),
                }),
            }
        };
        next.map(|content| Completion {
            content: Some(content),
            finish_reason: Some(FinishReason::Stop),
            model: request.model.clone(),
        })
    }
}

/// In-memory store recording history writes and serving reads
#[derive(Default)]
pub struct RecordingStore {
    pub records: Mutex<Vec<HistoryRecord>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn owner_matches(record: &HistoryRecord, owner: &HistoryOwner) -> bool {
        match owner {
            HistoryOwner::User(id) => record.user_id.as_deref() == Some(id),
            HistoryOwner::Session(id) => record.session_id.as_deref() == Some(id),
        }
    }
}

#[async_trait]
impl HistoryStore for RecordingStore {
    async fn save_history(
        &self,
        owner: &HistoryOwner,
        original_prompt: &str,
        optimized_prompt: &str,
        mode: &str,
    ) -> bool {
        let mut records = self.records.lock().unwrap();
        let id = i64::try_from(records.len()).unwrap() + 1;
        records.push(HistoryRecord {
            id,
            user_id: match owner {
                HistoryOwner::User(id) => Some(id.clone()),
                HistoryOwner::Session(_) => None,
            },
            session_id: match owner {
                HistoryOwner::Session(id) => Some(id.clone()),
                HistoryOwner::User(_) => None,
            },
            original_prompt: original_prompt.to_owned(),
            optimized_prompt: optimized_prompt.to_owned(),
            mode: mode.to_owned(),
            user_type: Some(owner.user_type().to_owned()),
            created_at: Utc::now(),
        });
        true
    }

    async fn get_history(
        &self,
        owner: &HistoryOwner,
        page: PageParams,
    ) -> AppResult<PagedResult<HistoryRecord>> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<HistoryRecord> = records
            .iter()
            .filter(|r| Self::owner_matches(r, owner))
            .cloned()
            .collect();
        matching.reverse(); // newest first

        let total = u32::try_from(matching.len()).unwrap();
        let page_size = page.page_size();
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page_size as usize)
            .collect();
        Ok(PagedResult::new(items, total, page_size))
    }

    async fn get_history_count(
        &self,
        owner: &HistoryOwner,
        mode: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u32> {
        let records = self.records.lock().unwrap();
        let count = records
            .iter()
            .filter(|r| Self::owner_matches(r, owner))
            .filter(|r| mode.map_or(true, |m| r.mode == m))
            .filter(|r| since.map_or(true, |s| r.created_at >= s))
            .count();
        Ok(u32::try_from(count).unwrap())
    }

    async fn get_profile(&self, _user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(None)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> AppResult<UserProfile> {
        Ok(UserProfile {
            id: user_id.to_owned(),
            username: update.username.clone(),
            avatar_url: update.avatar_url.clone(),
            updated_at: Some(Utc::now()),
        })
    }

    async fn get_subscription(&self, _user_id: &str) -> AppResult<Option<Subscription>> {
        Ok(None)
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_owned(),
            jwt_audience: "authenticated".to_owned(),
        },
        llm: LlmConfig {
            deepseek: ProviderCredentials {
                api_key: "test-key".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            gemini: ProviderCredentials {
                api_key: "test-key".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            gemini_quick: ProviderCredentials {
                api_key: "test-key".to_owned(),
                base_url: "http://localhost".to_owned(),
            },
            temperature: 0.5,
            optimize_max_tokens: 2000,
            thinking_max_tokens: 8000,
            quick_answer_max_tokens: 16_384,
            quick_answer_retry_max_tokens: 32_768,
        },
        supabase: SupabaseConfig {
            url: String::new(),
            anon_key: String::new(),
        },
        cors: CorsConfig {
            allowed_origins: "*".to_owned(),
        },
        rate_limit: RateLimitConfig {
            requests: 100,
            window_secs: 60,
        },
    }
}

/// Assemble application state over stub adapters
pub fn test_state(
    client: Arc<dyn CompletionClient>,
    store: Option<Arc<dyn HistoryStore>>,
) -> AppState {
    let config = Arc::new(test_config());
    AppState {
        config: config.clone(),
        auth: Arc::new(AuthManager::new(&config.auth)),
        optimizer: Arc::new(OptimizerService::new(
            client.clone(),
            store.clone(),
            config.llm.clone(),
        )),
        quick_answer: Arc::new(QuickAnswerService::new(client, config.llm.clone())),
        store,
    }
}

/// Signed bearer token accepted by the test state's AuthManager
pub fn bearer_token(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_owned(),
        email: Some("tester@example.com".to_owned()),
        aud: "authenticated".to_owned(),
        role: Some("authenticated".to_owned()),
        exp: usize::try_from(Utc::now().timestamp() + 3600).unwrap(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}
