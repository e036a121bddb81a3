// ABOUTME: Prompt optimization orchestration: optimize, interview and thinking flows
// ABOUTME: Content-quality failures degrade to deterministic fallbacks, never to 500s
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Prompt Orchestration
//!
//! Drives the optimization flows: plain optimize, the expert interview
//! (analyze → synthesize) and the thinking flow (analyze → optimize),
//! plus quick-option generation for clarification questions.
//!
//! The recovery policy is asymmetric on purpose: transport and auth
//! failures surface as errors, while unparseable model output degrades
//! to deterministic fallbacks. An interview that cannot ask at least one
//! question is a broken interview.

use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::{ChatMessage, Completion, CompletionClient, CompletionRequest, CredentialLane};
use crate::models::{self, OptimizeMode};
use crate::recovery::{recover_json_array, recover_json_object};
use crate::store::{HistoryOwner, HistoryStore};
use crate::templates;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// System instruction for the plain optimize flow
const OPTIMIZE_SYSTEM_INSTRUCTION: &str = "你是一位顶级的AI提示词优化引擎。你的任务是分析用户提供的原始提示词，并将其改写得更清晰、更具体、结构更合理、信息更充分，以便任何AI模型都能更好地理解并给出高质量的回复。请直接返回优化后的提示词文本，不要包含任何额外的解释或对话。";

/// System instruction for quick-option generation
const QUICK_OPTIONS_SYSTEM_INSTRUCTION: &str =
    "你是一位UX文案专家，擅长为表单问题设计简短、具体、易于选择的候选答案。";

/// Options served when generation fails or the model is unusable
const DEFAULT_QUICK_OPTIONS: [&str; 5] = [
    "专业正式",
    "简洁直接",
    "详细深入",
    "通俗易懂",
    "视情况灵活调整",
];

/// Tier labels used to pad an undersized option list
const PAD_OPTIONS: [&str; 3] = ["基础水平", "中等水平", "高级水平"];

const MIN_QUICK_OPTIONS: usize = 3;
const MAX_QUICK_OPTIONS: usize = 5;

/// Input control type for an interview question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Text,
    Textarea,
    Select,
}

/// One clarification question produced by an analyze stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisQuestion {
    /// Short identifier, stable within one interview
    pub key: String,
    /// Question text shown to the user
    pub question: String,
    /// Input control type
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    /// Input hint text
    #[serde(default)]
    pub placeholder: String,
    /// Whether an answer is required
    #[serde(default)]
    pub required: bool,
}

/// Analyze-stage output: a question set plus a one-line summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// One-line restatement of the idea
    #[serde(default)]
    pub summary: String,
    /// Clarification questions, at least one
    pub questions: Vec<AnalysisQuestion>,
}

/// Result of any flow that produces an optimized prompt
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOutcome {
    /// The optimized prompt text
    pub optimized_prompt: String,
    /// Model that served the call
    pub model_used: String,
}

/// Orchestrates the optimization flows over the adapter seams
pub struct OptimizerService {
    client: Arc<dyn CompletionClient>,
    store: Option<Arc<dyn HistoryStore>>,
    llm: LlmConfig,
}

impl OptimizerService {
    /// Build a service over a completion client and an optional store
    #[must_use]
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Option<Arc<dyn HistoryStore>>,
        llm: LlmConfig,
    ) -> Self {
        Self { client, store, llm }
    }

    /// Reject models outside the static registry
    ///
    /// # Errors
    ///
    /// Returns a 400-mapped validation error naming the supported set.
    pub fn validate_model(model: &str) -> AppResult<()> {
        if models::is_supported(model) {
            Ok(())
        } else {
            Err(AppError::invalid_input(format!(
                "unsupported model '{model}'; supported models: {}",
                models::supported_ids()
            )))
        }
    }

    async fn call(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<Completion, crate::llm::LlmError> {
        let request = CompletionRequest {
            model: model.to_owned(),
            messages,
            max_tokens,
            temperature: self.llm.temperature,
            lane: CredentialLane::Primary,
        };
        self.client.complete(&request).await
    }

    /// Spawn a history write; the response never waits on it
    fn persist_history(
        &self,
        owner: Option<&HistoryOwner>,
        original_prompt: &str,
        optimized_prompt: &str,
        mode: &str,
    ) {
        let Some(store) = self.store.clone() else {
            tracing::debug!("history store not configured, skipping save");
            return;
        };
        let Some(owner) = owner.cloned() else {
            tracing::debug!("no caller identity, skipping history save");
            return;
        };

        let original = original_prompt.to_owned();
        let optimized = optimized_prompt.to_owned();
        let mode = mode.to_owned();
        tokio::spawn(async move {
            store.save_history(&owner, &original, &optimized, &mode).await;
        });
    }

    /// Optimize a raw prompt with the mode's meta-prompt template
    ///
    /// # Errors
    ///
    /// Validation errors for unsupported models; upstream failures mapped
    /// through the `LlmError` taxonomy.
    pub async fn optimize(
        &self,
        original_prompt: &str,
        model: &str,
        mode: OptimizeMode,
        owner: Option<&HistoryOwner>,
    ) -> AppResult<OptimizeOutcome> {
        Self::validate_model(model)?;

        let template = templates::resolve(mode, models::family_of(model));
        let rendered = templates::render(template, original_prompt)?;

        let messages = vec![
            ChatMessage::system(OPTIMIZE_SYSTEM_INSTRUCTION),
            ChatMessage::user(rendered),
        ];
        let completion = self
            .call(model, messages, self.llm.optimize_max_tokens)
            .await
            .map_err(AppError::from)?;
        let optimized = completion.text().map_err(AppError::from)?.to_owned();

        self.persist_history(owner, original_prompt, &optimized, mode.as_str());

        Ok(OptimizeOutcome {
            optimized_prompt: optimized,
            model_used: completion.model,
        })
    }

    /// Analyze an idea into clarification questions (expert interview)
    ///
    /// Unparseable model output degrades to a keyword-matched fallback
    /// question set; only transport/auth failures surface as errors.
    ///
    /// # Errors
    ///
    /// Validation errors and upstream transport failures.
    pub async fn analyze_idea(
        &self,
        original_idea: &str,
        model: &str,
    ) -> AppResult<AnalysisResult> {
        Self::validate_model(model)?;

        let rendered = templates::render(templates::ANALYZER_TEMPLATE, original_idea)?;
        let completion = self
            .call(model, vec![ChatMessage::user(rendered)], self.llm.optimize_max_tokens)
            .await
            .map_err(AppError::from)?;

        let Ok(raw) = completion.text() else {
            tracing::warn!(model, "empty analyzer response, using fallback questions");
            return Ok(fallback_analysis(original_idea));
        };

        match recover_json_object(raw).and_then(parse_analysis) {
            Some(result) if !result.questions.is_empty() => Ok(result),
            _ => {
                tracing::warn!(model, "unrecoverable analyzer output, using fallback questions");
                Ok(fallback_analysis(original_idea))
            }
        }
    }

    /// Fold interview answers into a final prompt (expert interview)
    ///
    /// # Errors
    ///
    /// Validation errors and upstream failures.
    pub async fn synthesize_prompt(
        &self,
        original_idea: &str,
        user_answers: &BTreeMap<String, String>,
        model: &str,
        owner: Option<&HistoryOwner>,
    ) -> AppResult<OptimizeOutcome> {
        Self::validate_model(model)?;

        let answer_lines = render_answer_lines(user_answers);
        let rendered = templates::render_synthesis(
            templates::SYNTHESIZER_TEMPLATE,
            original_idea,
            &answer_lines,
        )?;

        let completion = self
            .call(model, vec![ChatMessage::user(rendered)], self.llm.optimize_max_tokens)
            .await
            .map_err(AppError::from)?;
        let optimized = completion.text().map_err(AppError::from)?.to_owned();

        self.persist_history(owner, original_idea, &optimized, OptimizeMode::Expert.as_str());

        Ok(OptimizeOutcome {
            optimized_prompt: optimized,
            model_used: completion.model,
        })
    }

    /// First thinking stage: probing questions as a JSON array
    ///
    /// Degrades to the same fallback question set as [`Self::analyze_idea`]
    /// when the array cannot be recovered.
    ///
    /// # Errors
    ///
    /// Validation errors and upstream transport failures.
    pub async fn analyze_thinking_prompt(
        &self,
        original_prompt: &str,
        model: &str,
    ) -> AppResult<Vec<AnalysisQuestion>> {
        Self::validate_model(model)?;

        let rendered = templates::render(templates::THINKING_ANALYZER_TEMPLATE, original_prompt)?;
        let completion = self
            .call(model, vec![ChatMessage::user(rendered)], self.llm.optimize_max_tokens)
            .await
            .map_err(AppError::from)?;

        let Ok(raw) = completion.text() else {
            tracing::warn!(model, "empty thinking analyzer response, using fallback questions");
            return Ok(fallback_analysis(original_prompt).questions);
        };

        match recover_json_array(raw).map(parse_question_array) {
            Some(questions) if !questions.is_empty() => Ok(questions),
            _ => {
                tracing::warn!(model, "unrecoverable thinking analyzer output, using fallback questions");
                Ok(fallback_analysis(original_prompt).questions)
            }
        }
    }

    /// Second thinking stage: synthesize the structured deep-thinking
    /// prompt at the higher token budget
    ///
    /// # Errors
    ///
    /// Validation errors and upstream failures.
    pub async fn optimize_thinking_prompt(
        &self,
        original_prompt: &str,
        additional_info: &BTreeMap<String, String>,
        model: &str,
        owner: Option<&HistoryOwner>,
    ) -> AppResult<OptimizeOutcome> {
        Self::validate_model(model)?;

        let answer_lines = render_answer_lines(additional_info);
        let rendered = templates::render_synthesis(
            templates::THINKING_OPTIMIZER_TEMPLATE,
            original_prompt,
            &answer_lines,
        )?;

        // The synthesized prompt folds the full answer map in; it runs
        // long, hence the dedicated budget.
        let completion = self
            .call(model, vec![ChatMessage::user(rendered)], self.llm.thinking_max_tokens)
            .await
            .map_err(AppError::from)?;
        let optimized = completion.text().map_err(AppError::from)?.to_owned();

        self.persist_history(owner, original_prompt, &optimized, OptimizeMode::Thinking.as_str());

        Ok(OptimizeOutcome {
            optimized_prompt: optimized,
            model_used: completion.model,
        })
    }

    /// Generate 3-5 quick-pick answers for a clarification question.
    ///
    /// This operation never fails: any adapter error or unusable output
    /// yields the fixed default option set.
    pub async fn generate_quick_options(
        &self,
        field_key: &str,
        question: &str,
        model: &str,
    ) -> Vec<String> {
        let model = if models::is_supported(model) {
            model
        } else {
            models::DEFAULT_MODEL
        };

        let Ok(rendered) = templates::render(templates::QUICK_OPTIONS_TEMPLATE, question) else {
            return default_quick_options();
        };

        let messages = vec![
            ChatMessage::system(QUICK_OPTIONS_SYSTEM_INSTRUCTION),
            ChatMessage::user(rendered),
        ];
        let completion = match self.call(model, messages, self.llm.optimize_max_tokens).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(field_key, "quick option generation failed: {e}");
                return default_quick_options();
            }
        };

        match completion.text() {
            Ok(raw) => normalize_options(raw),
            Err(_) => {
                tracing::warn!(field_key, "empty quick option response");
                default_quick_options()
            }
        }
    }
}

/// Render non-empty answers as `key: value` lines
fn render_answer_lines(answers: &BTreeMap<String, String>) -> String {
    answers
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{k}: {}", v.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a recovered JSON object into an [`AnalysisResult`].
///
/// Any shape mismatch yields `None` so the caller can fall back.
fn parse_analysis(value: Value) -> Option<AnalysisResult> {
    serde_json::from_value(value).ok()
}

/// Convert a recovered JSON array into questions.
///
/// Accepts both plain strings and `{key, question, ...}` objects;
/// unusable entries are dropped rather than failing the batch.
fn parse_question_array(value: Value) -> Vec<AnalysisQuestion> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Value::String(question) if !question.trim().is_empty() => Some(AnalysisQuestion {
                key: format!("question_{}", index + 1),
                question: question.trim().to_owned(),
                question_type: QuestionType::Text,
                placeholder: String::new(),
                required: false,
            }),
            entry @ Value::Object(_) => serde_json::from_value(entry).ok(),
            _ => None,
        })
        .collect()
}

/// Trim bullets and numbering from one model-produced option line
fn clean_option_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| {
            c.is_ascii_digit() || matches!(c, '-' | '*' | '•' | '.' | ')' | '、' | '：' | ':')
        })
        .trim()
}

/// Split model output into options, clamped to `3..=5`
fn normalize_options(raw: &str) -> Vec<String> {
    let mut options: Vec<String> = raw
        .lines()
        .map(clean_option_line)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect();

    options.truncate(MAX_QUICK_OPTIONS);
    for pad in PAD_OPTIONS {
        if options.len() >= MIN_QUICK_OPTIONS {
            break;
        }
        if !options.iter().any(|o| o == pad) {
            options.push(pad.to_owned());
        }
    }

    if options.len() < MIN_QUICK_OPTIONS {
        default_quick_options()
    } else {
        options
    }
}

fn default_quick_options() -> Vec<String> {
    DEFAULT_QUICK_OPTIONS.iter().map(|s| (*s).to_owned()).collect()
}

/// Deterministic fallback question set, keyword-matched against the idea
fn fallback_analysis(original_idea: &str) -> AnalysisResult {
    let lowered = original_idea.to_lowercase();

    let questions = if ["报告", "分析", "数据", "report", "analysis"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        vec![
            question("data_source", "你要分析的数据或材料来自哪里？", QuestionType::Textarea, "描述数据来源、范围和时间段", true),
            question("report_audience", "这份报告或分析的读者是谁？", QuestionType::Text, "例如：管理层、客户、团队成员", true),
            question("key_metrics", "你最关心哪些指标或结论？", QuestionType::Textarea, "列出希望重点回答的问题", false),
            question("report_format", "期望的结构和篇幅是怎样的？", QuestionType::Text, "例如：一页摘要、完整报告", false),
        ]
    } else if ["写", "文章", "文案", "故事", "write", "article", "content"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        vec![
            question("writing_audience", "这篇内容面向什么读者？", QuestionType::Text, "描述目标读者的特征", true),
            question("writing_style", "期望的风格和语气是什么？", QuestionType::Text, "例如：正式、轻松、幽默", true),
            question("key_points", "必须覆盖哪些要点或信息？", QuestionType::Textarea, "列出不能遗漏的内容", false),
            question("length_requirement", "对篇幅有什么要求？", QuestionType::Text, "例如：500字左右", false),
        ]
    } else {
        vec![
            question("main_goal", "你希望最终达成什么核心目标？", QuestionType::Textarea, "描述期望的结果", true),
            question("target_audience", "这个提示词主要面向什么用户或场景？", QuestionType::Text, "描述使用场景", true),
            question("constraints", "有哪些限制条件或特殊要求？", QuestionType::Textarea, "任何需要遵守的约束", false),
        ]
    };

    AnalysisResult {
        summary: "已根据你的想法生成基础澄清问题，请补充关键信息。".to_owned(),
        questions,
    }
}

fn question(
    key: &str,
    text: &str,
    question_type: QuestionType,
    placeholder: &str,
    required: bool,
) -> AnalysisQuestion {
    AnalysisQuestion {
        key: key.to_owned(),
        question: text.to_owned(),
        question_type,
        placeholder: placeholder.to_owned(),
        required,
    }
}
