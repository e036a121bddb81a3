// ABOUTME: Business-logic services sitting between the HTTP handlers and the adapters
// ABOUTME: Optimization orchestration and the quick-answer flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Service layer: prompt orchestration and quick answers.

pub mod optimizer;
pub mod quick_answer;

pub use optimizer::{AnalysisQuestion, AnalysisResult, OptimizeOutcome, OptimizerService};
pub use quick_answer::{QuickAnswer, QuickAnswerService};
