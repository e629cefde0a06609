use super::{AnalysisResult, EnhancementSuggestion, Priority};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Number of reply characters kept when the reply is not JSON.
pub const FALLBACK_DESCRIPTION_CHARS: usize = 200;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?([\s\S]*?)```").unwrap();
}

/// Outcome of reading a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Parsed(AnalysisResult),
    Degraded(String),
}

impl ParsedReply {
    /// Structured result, or a truncated-text fallback for degraded replies.
    pub fn into_result(self) -> AnalysisResult {
        match self {
            ParsedReply::Parsed(result) => result,
            ParsedReply::Degraded(text) => AnalysisResult {
                description: truncate_description(&text),
                ..AnalysisResult::default()
            },
        }
    }
}

/// Parses a model reply. A fenced code block is preferred; otherwise the whole
/// reply is read as JSON.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let candidate = FENCED_BLOCK
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply);

    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value @ Value::Object(_)) => ParsedReply::Parsed(read_result(&value)),
        Ok(other) => {
            log::warn!("Model reply was JSON but not an object: {}", other);
            ParsedReply::Degraded(reply.to_string())
        }
        Err(e) => {
            log::warn!("Model reply is not valid JSON, using text fallback: {}", e);
            ParsedReply::Degraded(reply.to_string())
        }
    }
}

fn truncate_description(text: &str) -> String {
    let truncated: String = text.chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
    format!("{}...", truncated)
}

fn read_result(value: &Value) -> AnalysisResult {
    AnalysisResult {
        description: value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        tags: string_list(value.get("tags")),
        hashtags: string_list(value.get("hashtags"))
            .into_iter()
            .map(|tag| {
                if tag.starts_with('#') {
                    tag
                } else {
                    format!("#{}", tag)
                }
            })
            .collect(),
        enhancement_suggestions: value
            .get("enhancementSuggestions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(read_suggestion).collect())
            .unwrap_or_default(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn read_suggestion(value: &Value) -> Option<EnhancementSuggestion> {
    let object = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(EnhancementSuggestion {
        title: text("title"),
        description: text("description"),
        priority: object
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::parse_lenient)
            .unwrap_or_default(),
    })
}
