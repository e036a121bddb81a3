// ABOUTME: Static model registry with family dispatch and optimization mode definitions
// ABOUTME: Adding a model means appending one entry to the MODELS table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Model Registry
//!
//! Static list of supported upstream model identifiers with display
//! metadata, plus the prefix rule that decides which provider family a
//! model name routes to. There is no dynamic discovery: adding a model
//! means appending to [`MODELS`].

use serde::{Deserialize, Serialize};

/// Default model applied when a request omits one
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// The Gemini model known to intermittently return empty completions
pub const FLAKY_GEMINI_MODEL: &str = "gemini-2.5-pro-preview-03-25";

/// Fallback model used once when the flaky model returns nothing
pub const GEMINI_FALLBACK_MODEL: &str = "gemini-2.0-flash";

/// Relative response speed of a model, as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    Fast,
    Medium,
    Slow,
}

/// Upstream provider family sharing an API shape and credential set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Gemini-compatible endpoints
    Gemini,
    /// DeepSeek-compatible endpoints
    DeepSeek,
}

impl ModelFamily {
    /// Display name used in operator-facing error messages
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::DeepSeek => "DeepSeek",
        }
    }
}

/// A supported model and its display metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model identifier sent to the upstream API
    pub id: &'static str,
    /// Human-readable display name
    pub name: &'static str,
    /// Short description for model pickers
    pub description: &'static str,
    /// Relative speed tier
    pub speed: SpeedTier,
}

/// Static table of supported models
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "deepseek-chat",
        name: "DeepSeek Chat (V3-0324)",
        description: "更快的响应速度，适合日常对话和简单任务",
        speed: SpeedTier::Fast,
    },
    ModelInfo {
        id: "deepseek-reasoner",
        name: "DeepSeek Reasoner (R1-0528)",
        description: "更强的推理能力，适合复杂分析和深度思考",
        speed: SpeedTier::Slow,
    },
    ModelInfo {
        id: "gemini-2.0-flash",
        name: "Gemini 2.0 Flash",
        description: "Google最新的Gemini 2.0 Flash，快速响应与高质量并存",
        speed: SpeedTier::Fast,
    },
    ModelInfo {
        id: "gemini-2.5-pro-preview-03-25",
        name: "Gemini 2.5 Pro Preview",
        description: "Google最新的Gemini 2.5 Pro预览版，具备更强的推理和创新能力",
        speed: SpeedTier::Medium,
    },
    ModelInfo {
        id: "gemini-2.5-flash-preview-05-20",
        name: "Gemini 2.5 Flash Preview",
        description: "Google最新的Gemini 2.5 Flash预览版，具备极速响应和卓越性能",
        speed: SpeedTier::Fast,
    },
];

/// Check whether a model id is a member of the static table
#[must_use]
pub fn is_supported(model_id: &str) -> bool {
    MODELS.iter().any(|m| m.id == model_id)
}

/// Provider family for a model id, by prefix test
#[must_use]
pub fn family_of(model_id: &str) -> ModelFamily {
    if model_id.starts_with("gemini-") {
        ModelFamily::Gemini
    } else {
        ModelFamily::DeepSeek
    }
}

/// Comma-separated list of supported ids, for validation error messages
#[must_use]
pub fn supported_ids() -> String {
    MODELS
        .iter()
        .map(|m| m.id)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Named template family controlling the optimization persona/structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeMode {
    General,
    Business,
    Drawing,
    Academic,
    Thinking,
    Expert,
}

impl OptimizeMode {
    /// Parse a mode string, falling back to `general` for unknown values
    #[must_use]
    pub fn from_str_or_general(mode: &str) -> Self {
        match mode {
            "business" => Self::Business,
            "drawing" => Self::Drawing,
            "academic" => Self::Academic,
            "thinking" => Self::Thinking,
            "expert" => Self::Expert,
            _ => Self::General,
        }
    }

    /// Stable string form, as persisted in history records
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Business => "business",
            Self::Drawing => "drawing",
            Self::Academic => "academic",
            Self::Thinking => "thinking",
            Self::Expert => "expert",
        }
    }
}

impl std::fmt::Display for OptimizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
