//! Removal of thinking spans from assistant text
//!
//! Assistant replies may embed `<think>...</think>` spans carrying the
//! model's internal reasoning. They are stripped before display and before
//! speech, through this one function, so both always agree.

use once_cell::sync::Lazy;
use regex::Regex;

static THINKING_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("thinking span pattern is valid")
});

/// Removes every complete `<think>...</think>` span and trims the result.
///
/// Idempotent and order-preserving for the remaining text. An opening tag
/// without a closing tag is left in place.
pub fn strip_thinking_spans(text: &str) -> String {
    THINKING_SPAN.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_a_single_span() {
        let raw = "<think>weighing options</think>Here is the answer.";
        assert_eq!(strip_thinking_spans(raw), "Here is the answer.");
    }

    #[test]
    fn strips_multiple_spans_preserving_order() {
        let raw = "One <think>a</think>two <think>b</think>three";
        assert_eq!(strip_thinking_spans(raw), "One two three");
    }

    #[test]
    fn spans_may_cross_newlines() {
        let raw = "Answer:<think>line one\nline two\nline three</think> 42";
        assert_eq!(strip_thinking_spans(raw), "Answer: 42");
    }

    #[test]
    fn non_greedy_between_spans() {
        let raw = "<think>a</think>keep<think>b</think>";
        assert_eq!(strip_thinking_spans(raw), "keep");
    }

    #[test]
    fn idempotent_on_cleaned_text() {
        let raw = "  <think>hmm</think>  Plain reply  ";
        let once = strip_thinking_spans(raw);
        let twice = strip_thinking_spans(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "Plain reply");
    }

    #[test]
    fn text_without_spans_is_only_trimmed() {
        assert_eq!(strip_thinking_spans("  hello  "), "hello");
        assert_eq!(strip_thinking_spans("hello"), "hello");
    }

    #[test]
    fn unterminated_opening_tag_is_left_in_place() {
        let raw = "<think>never closed";
        assert_eq!(strip_thinking_spans(raw), "<think>never closed");
    }

    #[test]
    fn no_delimiters_survive_stripping() {
        let raw = "a<think>x</think>b<think>y</think>c";
        let cleaned = strip_thinking_spans(raw);
        assert!(!cleaned.contains("<think>"));
        assert!(!cleaned.contains("</think>"));
    }
}
