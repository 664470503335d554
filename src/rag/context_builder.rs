//! Context assembly.
//!
//! Joins chunk contents in retrieval order and hard-truncates the result.
//! Truncation counts characters, not tokens or sentences, and may cut
//! mid-word; the cap is a hard invariant.

use super::store::ChunkMatch;

/// Join chunk contents with a blank line and truncate to `max_length`
/// characters. Chunks are never reordered or dropped selectively — only the
/// tail is cut.
pub fn build_context(matches: &[ChunkMatch], max_length: usize) -> String {
    let joined = matches
        .iter()
        .map(|m| m.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    truncate_chars(&joined, max_length)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    fn matches(contents: &[&str]) -> Vec<ChunkMatch> {
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| ChunkMatch {
                chunk: StoredChunk {
                    chunk_id: format!("c{}", i),
                    document_id: "d".to_string(),
                    chunk_index: i as i64,
                    content: content.to_string(),
                },
                similarity: 0.0,
            })
            .collect()
    }

    #[test]
    fn joins_in_retrieval_order_with_blank_line() {
        let context = build_context(&matches(&["first", "second", "third"]), 700);
        assert_eq!(context, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(build_context(&[], 700), "");
    }

    #[test]
    fn never_exceeds_max_length() {
        let long = "x".repeat(500);
        let context = build_context(&matches(&[&long, &long]), 700);
        assert_eq!(context.chars().count(), 700);
        // Output equals the naive join truncated.
        let naive: String = format!("{}\n\n{}", long, long).chars().take(700).collect();
        assert_eq!(context, naive);
    }

    #[test]
    fn truncation_may_cut_mid_word() {
        let context = build_context(&matches(&["hello world"]), 8);
        assert_eq!(context, "hello wo");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let context = build_context(&matches(&["금융보고서분석"]), 4);
        assert_eq!(context, "금융보고");
    }
}
