// ABOUTME: Heuristic detection of truncated long-form answers and clean-boundary cutting
// ABOUTME: Pattern matching over natural-language endings, best-effort only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Truncation Heuristics
//!
//! A long-form answer that ran out of tokens usually stops mid-sentence.
//! [`is_possibly_truncated`] flags suspicious endings so the caller can
//! retry once at a higher budget; [`cut_at_sentence_boundary`] enforces a
//! hard length ceiling without leaving a dangling fragment.
//!
//! This is pattern matching over natural-language endings in Chinese and
//! English, not a guarantee. False positives cost one extra upstream
//! call; false negatives ship a clipped answer.

/// Below this many characters an answer is implausibly short
const MIN_PLAUSIBLE_CHARS: usize = 50;

/// Above this many characters an answer is implausibly long for the
/// budgets in use and is treated as a runaway generation
const MAX_PLAUSIBLE_CHARS: usize = 45_000;

/// How far back from the end to look for a strong ending on long texts
const TAIL_WINDOW_CHARS: usize = 300;

/// Texts longer than this get the tail-window check
const TAIL_CHECK_MIN_CHARS: usize = 1_000;

/// Punctuation that can legitimately end a complete answer
const STRONG_ENDINGS: &[char] = &[
    '。', '！', '？', '.', '!', '?', '”', '"', '）', ')', '】', ']', '`',
];

/// Endings that almost always indicate a cut-off sentence
const DANGLING_ENDINGS: &[&str] = &[
    ",", "，", "、", ":", "：", ";", "；", "...", "……", "—", "-", "(", "（", "“",
];

/// Connectives that never end a complete sentence
const DANGLING_WORDS: &[&str] = &[
    "and", "or", "but", "the", "a", "an", "to", "of", "with", "for", "in", "on", "is", "are",
    "和", "与", "或", "但", "而", "因为", "所以", "如果", "虽然", "并且", "以及", "例如", "比如",
];

/// Phrases that signal a deliberate closing paragraph
const CLOSING_PHRASES: &[&str] = &[
    "总结", "综上", "总之", "总的来说", "希望", "祝你", "祝您", "以上", "最后",
    "In summary", "In conclusion", "Overall", "To summarize", "Hope this helps",
    "Best regards", "Good luck",
];

/// Flag an answer whose ending looks cut off.
///
/// Triggers on: implausibly short or long text, a dangling
/// connective/comma/ellipsis ending, or (for long texts) a tail window
/// with neither strong ending punctuation nor a recognizable closing
/// phrase.
#[must_use]
pub fn is_possibly_truncated(text: &str) -> bool {
    let trimmed = text.trim_end();
    let char_count = trimmed.chars().count();

    if char_count < MIN_PLAUSIBLE_CHARS || char_count > MAX_PLAUSIBLE_CHARS {
        return true;
    }

    if DANGLING_ENDINGS.iter().any(|s| trimmed.ends_with(s)) {
        return true;
    }

    if let Some(last_word) = trimmed
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .map(str::to_lowercase)
    {
        if DANGLING_WORDS.contains(&last_word.as_str()) {
            return true;
        }
        // CJK text rarely has spaces; check the trailing characters too
        if DANGLING_WORDS
            .iter()
            .any(|w| !w.is_ascii() && trimmed.ends_with(w))
        {
            return true;
        }
    }

    if char_count >= TAIL_CHECK_MIN_CHARS {
        let tail: String = trimmed
            .chars()
            .skip(char_count.saturating_sub(TAIL_WINDOW_CHARS))
            .collect();
        let has_strong_ending = tail.chars().any(|c| STRONG_ENDINGS.contains(&c));
        let has_closing_phrase = CLOSING_PHRASES.iter().any(|p| tail.contains(p));
        if !has_strong_ending && !has_closing_phrase {
            return true;
        }
    }

    false
}

/// Cut text at the last clean sentence boundary at or before `max_chars`.
///
/// Returns the input unchanged when it fits. When no boundary exists in
/// the window, falls back to a plain character cut rather than returning
/// nothing.
#[must_use]
pub fn cut_at_sentence_boundary(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_owned();
    }

    let window = &chars[..max_chars];
    let boundary = window
        .iter()
        .rposition(|c| STRONG_ENDINGS.contains(c))
        .map_or(max_chars, |i| i + 1);

    window[..boundary].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_complete_answer() -> String {
        let mut body = "本文分析该问题的三个方面。".repeat(120);
        body.push_str("综上所述，以上就是完整的分析与建议。");
        body
    }

    #[test]
    fn test_short_text_is_flagged() {
        assert!(is_possibly_truncated("太短了。"));
    }

    #[test]
    fn test_complete_short_paragraph_passes() {
        let text = "这个问题的答案取决于具体场景。对于大多数情况，建议优先考虑成本与可维护性之间的平衡，然后再针对瓶颈逐项评估性能表现。";
        assert!(!is_possibly_truncated(text));
    }

    #[test]
    fn test_dangling_comma_is_flagged() {
        let text = "这个问题需要从三个角度来分析。首先是成本角度，我们需要考虑初期投入和长期维护费用，其次是，";
        assert!(is_possibly_truncated(text));
    }

    #[test]
    fn test_dangling_connective_is_flagged() {
        let text = "There are several factors to consider when choosing a database system for this workload, including consistency requirements and";
        assert!(is_possibly_truncated(text));
    }

    #[test]
    fn test_dangling_cjk_connective_is_flagged() {
        let text = "选择数据库时需要考虑一致性要求、运维成本以及团队的技术储备，这些因素共同决定了最终方案，因为";
        assert!(is_possibly_truncated(text));
    }

    #[test]
    fn test_ellipsis_is_flagged() {
        let text = "关于这个问题，可以从以下几个维度展开分析，分别是成本、性能、可维护性以及团队能力，具体来说……";
        assert!(is_possibly_truncated(text));
    }

    #[test]
    fn test_long_complete_answer_passes() {
        assert!(!is_possibly_truncated(&long_complete_answer()));
    }

    #[test]
    fn test_long_text_without_ending_punctuation_is_flagged() {
        // No sentence punctuation at all in the tail window
        let text = "分析内容".repeat(800);
        assert!(is_possibly_truncated(&text));
    }

    #[test]
    fn test_runaway_length_is_flagged() {
        let mut text = "正常的句子。".repeat(10_000);
        text.push_str("综上所述，分析完毕。");
        assert!(is_possibly_truncated(&text));
    }

    #[test]
    fn test_cut_returns_short_text_unchanged() {
        assert_eq!(cut_at_sentence_boundary("完整回答。", 100), "完整回答。");
    }

    #[test]
    fn test_cut_lands_on_sentence_boundary() {
        let text = "第一句话。第二句话。第三句话还没有说完就被";
        let cut = cut_at_sentence_boundary(text, 12);
        assert_eq!(cut, "第一句话。第二句话。");
    }

    #[test]
    fn test_cut_without_boundary_falls_back_to_plain_cut() {
        let text = "没有任何标点的超长文本内容一直延续下去";
        let cut = cut_at_sentence_boundary(text, 5);
        assert_eq!(cut.chars().count(), 5);
    }
}
