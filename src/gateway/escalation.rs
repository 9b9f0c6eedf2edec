//! Search-escalation policy: decide, after a plain model call, whether a
//! second (and final) call is needed.
//!
//! Two signals, checked in order: an explicit `<search>keyword</search>`
//! marker the model emits to request a history lookup, and a fixed set of
//! phrases indicating the model intends to look something up. At most one
//! extra model call per request.

/// Utterance keywords that route straight to grounded mode, before any
/// plain call happens.
const SEARCH_TRIGGER_KW: &[&str] = &[
    "今日の", "明日の", "最新", "現在",
    "天気", "ニュース", "調べて", "検索して",
    "株価", "為替",
];

/// Reply phrases that mean the model wants to look something up.
const LOOKUP_PHRASES: &[&str] = &[
    "検索します",
    "検索してみます",
    "調べます",
    "調べてみます",
    "お調べします",
    "確認してみます",
];

const MARKER_OPEN: &str = "<search>";
const MARKER_CLOSE: &str = "</search>";

/// What to do with a plain model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Reply stands as-is.
    UseAsIs,
    /// Search the durable log for the keyword; re-call with matches, or
    /// grounded with the original message when nothing matches.
    HistorySearch(String),
    /// Re-call in grounded mode with the original message.
    Grounded,
}

/// Classify a plain reply. Explicit marker wins over phrase heuristics.
pub fn decide(reply: &str) -> Decision {
    if let Some(keyword) = extract_search_marker(reply) {
        return Decision::HistorySearch(keyword);
    }
    if indicates_search_intent(reply) {
        return Decision::Grounded;
    }
    Decision::UseAsIs
}

/// Does the raw utterance itself ask for live information?
pub fn needs_search(text: &str) -> bool {
    SEARCH_TRIGGER_KW.iter().any(|kw| text.contains(kw))
}

/// Extract the keyword from the first `<search>…</search>` marker.
pub fn extract_search_marker(text: &str) -> Option<String> {
    let start = text.find(MARKER_OPEN)? + MARKER_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(MARKER_CLOSE)?;
    let keyword = rest[..end].trim();
    if keyword.is_empty() {
        None
    } else {
        Some(keyword.to_string())
    }
}

fn indicates_search_intent(reply: &str) -> bool {
    LOOKUP_PHRASES.iter().any(|p| reply.contains(p))
}

/// Remove every `<search>…</search>` span and any stray tags. Residual
/// marker syntax must never reach display or speech.
pub fn strip_search_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(MARKER_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + MARKER_OPEN.len()..];
        match after.find(MARKER_CLOSE) {
            Some(end) => rest = &after[end + MARKER_CLOSE.len()..],
            None => {
                rest = after;
                break;
            }
        }
    }
    out.push_str(rest);
    out.replace(MARKER_CLOSE, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_extraction() {
        assert_eq!(
            extract_search_marker("<search>ポチ</search>"),
            Some("ポチ".to_string())
        );
        assert_eq!(
            extract_search_marker("前に話しましたね。<search>旅行の計画</search>"),
            Some("旅行の計画".to_string())
        );
        assert_eq!(extract_search_marker("<search></search>"), None);
        assert_eq!(extract_search_marker("マーカーなし"), None);
        assert_eq!(extract_search_marker("<search>閉じ忘れ"), None);
    }

    #[test]
    fn test_decide_marker_wins_over_phrases() {
        // A marker plus a lookup phrase still means history search.
        let d = decide("調べてみますね。<search>犬の名前</search>");
        assert_eq!(d, Decision::HistorySearch("犬の名前".to_string()));
    }

    #[test]
    fn test_decide_phrase_escalates_to_grounded() {
        assert_eq!(decide("ちょっと検索してみますね！"), Decision::Grounded);
        assert_eq!(decide("それはお調べしますね"), Decision::Grounded);
    }

    #[test]
    fn test_decide_plain_reply_stands() {
        assert_eq!(decide("こんにちは！元気ですよ！"), Decision::UseAsIs);
    }

    #[test]
    fn test_needs_search_on_utterance() {
        assert!(needs_search("今日の天気は？"));
        assert!(needs_search("最新のニュース教えて"));
        assert!(needs_search("トヨタの株価は？"));
        assert!(!needs_search("こんにちは"));
    }

    #[test]
    fn test_strip_removes_spans_and_stray_tags() {
        assert_eq!(
            strip_search_markers("前置き<search>kw</search>後置き"),
            "前置き後置き"
        );
        assert_eq!(strip_search_markers("壊れた</search>タグ"), "壊れたタグ");
        assert_eq!(strip_search_markers("<search>閉じ忘れ"), "閉じ忘れ");
        assert_eq!(strip_search_markers("マーカーなし"), "マーカーなし");
    }
}
