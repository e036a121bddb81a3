// ABOUTME: Layered heuristics for recovering structured JSON from LLM free text
// ABOUTME: Tries direct parse, fenced blocks, balanced-brace scan, then a permissive regex
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # JSON Recovery
//!
//! Models asked for "JSON only" still wrap their output in prose,
//! markdown fences, or both. These helpers recover the structured payload
//! with a fixed layer order, stopping at the first layer that yields
//! valid JSON. Callers decide what to do when every layer fails.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn questions_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r#"(?s)\{[^{}]*"questions"\s*:\s*\[.*\]\s*\}"#).unwrap())
}

/// Recover a JSON object from free-form model output.
///
/// Layer order, stopping at the first success:
/// 1. parse the whole trimmed response;
/// 2. parse the contents of a fenced code block (```json, ``` or single
///    backticks);
/// 3. brace-count the first balanced `{...}` span and parse it;
/// 4. regex-match an object containing a `"questions"` key and parse it.
///
/// Returns `None` when no layer yields a JSON object.
#[must_use]
pub fn recover_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(inner.trim()) {
            return Some(value);
        }
    }

    if let Some(span) = balanced_span(trimmed, '{', '}') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    if let Some(found) = questions_object_regex().find(trimmed) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(found.as_str()) {
            return Some(value);
        }
    }

    None
}

/// Recover a JSON array from free-form model output.
///
/// Simpler than the object path: direct parse, else the first balanced
/// `[...]` span. Returns `None` when neither yields a JSON array.
#[must_use]
pub fn recover_json_array(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(inner.trim()) {
            return Some(value);
        }
    }

    if let Some(span) = balanced_span(trimmed, '[', ']') {
        if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    None
}

/// Extract the contents of the first fenced code block.
///
/// Handles ```json ... ```, bare ``` ... ``` and single-backtick spans,
/// in that order.
fn fenced_block(text: &str) -> Option<&str> {
    for opener in ["```json", "```"] {
        if let Some(start) = text.find(opener) {
            let body = &text[start + opener.len()..];
            if let Some(end) = body.find("```") {
                return Some(&body[..end]);
            }
        }
    }
    let start = text.find('`')?;
    let body = &text[start + 1..];
    let end = body.find('`')?;
    Some(&body[..end])
}

/// First balanced `open...close` span, found by depth counting.
///
/// String-literal awareness is deliberately omitted; a brace inside a
/// JSON string can make the span unbalanced, in which case the next
/// layer gets its chance.
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + close.len_utf8()]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_object_parse() {
        let value = recover_json_object(r#"  {"questions": [], "summary": "ok"}  "#).unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn test_fenced_json_block() {
        let raw = "好的，以下是分析结果：\n```json\n{\"questions\": [{\"key\": \"audience\"}], \"summary\": \"s\"}\n```\n希望对你有帮助。";
        let value = recover_json_object(raw).unwrap();
        assert_eq!(value["questions"][0]["key"], "audience");
    }

    #[test]
    fn test_bare_fence_block() {
        let raw = "```\n{\"questions\": []}\n```";
        assert!(recover_json_object(raw).is_some());
    }

    #[test]
    fn test_brace_scan_with_surrounding_prose() {
        let raw = "Sure! Here you go: {\"questions\": [], \"summary\": \"s\"} Let me know.";
        let value = recover_json_object(raw).unwrap();
        assert_eq!(value["summary"], "s");
    }

    #[test]
    fn test_nested_braces_scan() {
        let raw = "prefix {\"a\": {\"b\": 1}} suffix";
        let value = recover_json_object(raw).unwrap();
        assert_eq!(value["a"]["b"], 1);
    }

    #[test]
    fn test_pure_noise_yields_none() {
        assert!(recover_json_object("抱歉，我无法生成问题。").is_none());
        assert!(recover_json_object("").is_none());
        assert!(recover_json_object("{broken json").is_none());
    }

    #[test]
    fn test_top_level_array_is_not_an_object() {
        assert!(recover_json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_direct_array_parse() {
        let value = recover_json_array(r#"["q1", "q2"]"#).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_array_span_in_prose() {
        let raw = "问题如下：[\"第一个问题\", \"第二个问题\"] 请参考。";
        let value = recover_json_array(raw).unwrap();
        assert_eq!(value[0], "第一个问题");
    }

    #[test]
    fn test_fenced_array() {
        let raw = "```json\n[\"q\"]\n```";
        assert!(recover_json_array(raw).is_some());
    }

    #[test]
    fn test_array_noise_yields_none() {
        assert!(recover_json_array("no array here").is_none());
        assert!(recover_json_array("[unterminated").is_none());
    }
}
