//! Prompt selection and message assembly.
//!
//! The pipeline picks one of three mutually exclusive prompt variants per
//! invocation and composes the generator input from a bounded recent-history
//! window plus the question. The exact wording is an implementation detail;
//! the structure (which variant, what goes into the user message, what is
//! persisted) is not: persisted user turns hold only the raw question, never
//! the injected context block.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Self-reported financial literacy of the user, used to tune prompt tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl UserLevel {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "intermediate" => UserLevel::Intermediate,
            "advanced" => UserLevel::Advanced,
            _ => UserLevel::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Beginner => "beginner",
            UserLevel::Intermediate => "intermediate",
            UserLevel::Advanced => "advanced",
        }
    }

    fn tone_instruction(&self) -> &'static str {
        match self {
            UserLevel::Beginner => {
                "Explain plainly, define financial terms on first use, and avoid jargon."
            }
            UserLevel::Intermediate => {
                "Assume familiarity with common financial terms; keep explanations focused."
            }
            UserLevel::Advanced => {
                "Answer at a professional level; precision over simplification."
            }
        }
    }
}

/// The prompt variant for one invocation, chosen once from
/// `(document bound?, context non-empty?)`. Each arm carries exactly the
/// data its template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptVariant {
    /// The thread is bound to a document; answers stay within it.
    DocumentGrounded { document_id: String },
    /// Open thread with relevant retrieved context.
    GeneralWithContext,
    /// Open thread, no usable context; answer from general knowledge.
    GeneralWithoutContext,
}

/// Document binding dominates; context presence only matters for open
/// threads.
pub fn select_variant(document_id: Option<&str>, context: &str) -> PromptVariant {
    match document_id {
        Some(id) => PromptVariant::DocumentGrounded {
            document_id: id.to_string(),
        },
        None if !context.trim().is_empty() => PromptVariant::GeneralWithContext,
        None => PromptVariant::GeneralWithoutContext,
    }
}

fn system_prompt(variant: &PromptVariant, user_level: UserLevel) -> String {
    let base = match variant {
        PromptVariant::DocumentGrounded { document_id } => format!(
            "You are a financial report analysis assistant. This conversation is about \
             document {}. Answer strictly from the retrieved document context; if the \
             context does not contain the answer, say so instead of inventing one.",
            document_id
        ),
        PromptVariant::GeneralWithContext => "You are a financial Q&A assistant. Retrieved \
             document context is provided; prefer it over general knowledge and do not \
             invent facts that are not in it."
            .to_string(),
        PromptVariant::GeneralWithoutContext => "You are a financial Q&A assistant. No \
             document context applies to this question; answer from general financial and \
             economic knowledge."
            .to_string(),
    };

    format!("{} {}", base, user_level.tone_instruction())
}

/// The user message sent to the generator: the raw question, prefixed with a
/// context block only when context exists. Persisted history must never
/// contain this block — callers store the raw question separately.
pub fn compose_user_message(question: &str, context: &str) -> String {
    if context.trim().is_empty() {
        question.to_string()
    } else {
        format!(
            "[Retrieved document context]\n{}\n\n[Question]\n{}",
            context, question
        )
    }
}

/// Assemble the full generator input: system prompt, the most recent
/// `history_window` messages, then the composed user message.
pub fn conversation_messages(
    variant: &PromptVariant,
    user_level: UserLevel,
    history: &[ChatMessage],
    context: &str,
    question: &str,
    history_window: usize,
) -> Vec<ChatMessage> {
    let recent_start = history.len().saturating_sub(history_window);

    let mut messages = Vec::with_capacity(history.len() - recent_start + 2);
    messages.push(ChatMessage::system(system_prompt(variant, user_level)));
    messages.extend(history[recent_start..].iter().cloned());
    messages.push(ChatMessage::user(compose_user_message(question, context)));
    messages
}

/// Build the follow-up generation request from the just-produced turn.
/// `context_prefix` is already bounded by the caller.
pub fn followup_messages(
    question: &str,
    answer: &str,
    context_prefix: &str,
    user_level: UserLevel,
    count: usize,
) -> Vec<ChatMessage> {
    let system = format!(
        "You suggest follow-up questions for a financial Q&A assistant. Given the last \
         exchange, propose exactly {} short follow-up questions a {} user would naturally \
         ask next. Wrap each one in <question></question> tags and output nothing else.",
        count,
        user_level.as_str()
    );

    let reference = if context_prefix.trim().is_empty() {
        format!("[Question]\n{}\n\n[Answer]\n{}", question, answer)
    } else {
        format!(
            "[Question]\n{}\n\n[Answer]\n{}\n\n[Context]\n{}",
            question, answer, context_prefix
        )
    };

    vec![ChatMessage::system(system), ChatMessage::user(reference)]
}

fn question_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<question>(.*?)</question>").expect("static regex"))
}

/// Parse follow-up suggestions from provider output.
///
/// Primary format is `<question>` tags; a newline-delimited list (with
/// optional numbering or bullet markers) is accepted as fallback. Blank
/// entries are dropped and the result is truncated to `count` — never padded
/// beyond what was actually parsed. Unparseable output yields an empty list,
/// not an error.
pub fn parse_follow_ups(raw: &str, count: usize) -> Vec<String> {
    let mut questions: Vec<String> = question_tag_re()
        .captures_iter(raw)
        .map(|cap| cap[1].trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        questions = raw
            .lines()
            .map(strip_list_marker)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    questions.truncate(count);
    questions
}

fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    let trimmed = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .unwrap_or(trimmed);

    // "1." / "2)" style numbering
    let digits_end = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .map(|(i, c)| i + c.len_utf8())
        .last();
    if let Some(end) = digits_end {
        let rest = &trimmed[end..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    // =======================================================================
    // UserLevel tests
    // =======================================================================

    #[test]
    fn user_level_default_is_beginner() {
        assert_eq!(UserLevel::default(), UserLevel::Beginner);
    }

    #[test]
    fn user_level_from_str_is_lenient() {
        assert_eq!(UserLevel::from_str("advanced"), UserLevel::Advanced);
        assert_eq!(UserLevel::from_str(" INTERMEDIATE "), UserLevel::Intermediate);
        assert_eq!(UserLevel::from_str("expert"), UserLevel::Beginner);
        assert_eq!(UserLevel::from_str(""), UserLevel::Beginner);
    }

    #[test]
    fn user_level_as_str_roundtrip() {
        for level in [
            UserLevel::Beginner,
            UserLevel::Intermediate,
            UserLevel::Advanced,
        ] {
            assert_eq!(UserLevel::from_str(level.as_str()), level);
        }
    }

    // =======================================================================
    // Variant selection
    // =======================================================================

    #[test]
    fn variant_document_binding_dominates() {
        assert_eq!(
            select_variant(Some("d1"), "some context"),
            PromptVariant::DocumentGrounded {
                document_id: "d1".to_string()
            }
        );
        assert_eq!(
            select_variant(Some("d1"), ""),
            PromptVariant::DocumentGrounded {
                document_id: "d1".to_string()
            }
        );
    }

    #[test]
    fn variant_open_thread_depends_on_context() {
        assert_eq!(
            select_variant(None, "context"),
            PromptVariant::GeneralWithContext
        );
        assert_eq!(select_variant(None, ""), PromptVariant::GeneralWithoutContext);
        assert_eq!(
            select_variant(None, "   "),
            PromptVariant::GeneralWithoutContext
        );
    }

    // =======================================================================
    // Message assembly
    // =======================================================================

    #[test]
    fn user_message_includes_context_block_only_when_context_exists() {
        let with = compose_user_message("what is EPS?", "EPS rose 10%");
        assert!(with.contains("[Retrieved document context]"));
        assert!(with.contains("EPS rose 10%"));
        assert!(with.ends_with("what is EPS?"));

        let without = compose_user_message("what is EPS?", "");
        assert_eq!(without, "what is EPS?");
    }

    #[test]
    fn history_window_keeps_most_recent_messages() {
        let history: Vec<ChatMessage> = (0..14)
            .map(|i| ChatMessage::user(format!("m{}", i)))
            .collect();
        let variant = PromptVariant::GeneralWithoutContext;

        let messages =
            conversation_messages(&variant, UserLevel::Beginner, &history, "", "q", 10);

        // system + 10 recent + current question
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "m4");
        assert_eq!(messages.last().unwrap().content, "q");
    }

    #[test]
    fn short_history_is_passed_whole() {
        let history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        let variant = PromptVariant::GeneralWithContext;

        let messages =
            conversation_messages(&variant, UserLevel::Advanced, &history, "ctx", "q", 10);
        assert_eq!(messages.len(), 4);
        assert!(messages.last().unwrap().content.contains("ctx"));
    }

    // =======================================================================
    // Follow-up parsing
    // =======================================================================

    #[test]
    fn parses_question_tags() {
        let raw = "<question>What drove revenue?</question>\n\
                   <question>How did margins change?</question>\n\
                   <question>What are the risks?</question>";
        let parsed = parse_follow_ups(raw, 3);
        assert_eq!(
            parsed,
            vec![
                "What drove revenue?",
                "How did margins change?",
                "What are the risks?"
            ]
        );
    }

    #[test]
    fn truncates_to_requested_count() {
        let raw = "<question>a</question><question>b</question>\
                   <question>c</question><question>d</question>";
        assert_eq!(parse_follow_ups(raw, 3).len(), 3);
    }

    #[test]
    fn drops_blank_entries_and_never_fabricates() {
        let raw = "<question>  </question><question>real</question>";
        assert_eq!(parse_follow_ups(raw, 3), vec!["real"]);
    }

    #[test]
    fn newline_fallback_strips_list_markers() {
        let raw = "1. First question?\n2) Second question?\n- Third question?\n\n";
        assert_eq!(
            parse_follow_ups(raw, 3),
            vec!["First question?", "Second question?", "Third question?"]
        );
    }

    #[test]
    fn unparseable_output_yields_empty_list() {
        assert!(parse_follow_ups("", 3).is_empty());
        assert!(parse_follow_ups("   \n  \n", 3).is_empty());
    }

    #[test]
    fn tag_spanning_newlines_is_parsed() {
        let raw = "<question>What about\nnext quarter?</question>";
        assert_eq!(parse_follow_ups(raw, 3), vec!["What about\nnext quarter?"]);
    }
}
