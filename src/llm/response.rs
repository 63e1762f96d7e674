//! Normalization of chat-completion responses.
//!
//! Providers disagree on where the generated text lives and how token usage
//! is named. This module finds the text, strips any code-fence wrapper the
//! model added, and reads usage under either naming convention.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;

/// An opening fence with an optional info string.
static OPENING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```(?:[A-Za-z0-9_+.-]*[ \t]*\r?\n)?").expect("Invalid regex")
});

const FENCE: &str = "```";

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A successfully generated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub message: String,
    pub usage: Option<Usage>,
}

/// Parse a raw response body into a [`Completion`].
pub fn parse_completion(body: &str) -> Result<Completion, ProviderError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        let truncated: String = body.chars().take(200).collect();
        debug!("Response is not valid JSON: {}. Body: {}", e, truncated);
        ProviderError::UnexpectedFormat
    })?;

    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        return Err(ProviderError::Api(error_message(error)));
    }

    let text = extract_text(&value).ok_or(ProviderError::UnexpectedFormat)?;
    let message = clean_message(text);
    if message.is_empty() {
        return Err(ProviderError::EmptyMessage);
    }

    Ok(Completion {
        message,
        usage: extract_usage(&value),
    })
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Locate the generated text.
///
/// Tries, in order:
/// 1. `choices[0].message.content`
/// 2. `choices[0].text`
/// 3. `result[0].content`
fn extract_text(value: &Value) -> Option<&str> {
    let first_choice = value.get("choices").and_then(|choices| choices.get(0));

    first_choice
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .or_else(|| {
            first_choice
                .and_then(|choice| choice.get("text"))
                .and_then(Value::as_str)
        })
        .or_else(|| value.pointer("/result/0/content").and_then(Value::as_str))
}

/// Strip a wrapping code fence and stray backticks, then trim.
///
/// Each end of the fence is handled on its own: the model may stop before
/// closing the block, or add commentary after it. Anything after the closing
/// fence of an opened block is dropped.
pub fn clean_message(text: &str) -> String {
    let trimmed = text.trim();

    let (body, opened) = match OPENING_FENCE.find(trimmed) {
        Some(fence) => (&trimmed[fence.end()..], true),
        None => (trimmed, false),
    };
    let unfenced = match body.find(FENCE) {
        Some(end) if opened => &body[..end],
        _ => body.strip_suffix(FENCE).unwrap_or(body),
    };

    let unfenced = unfenced.strip_prefix('`').unwrap_or(unfenced);
    let unfenced = unfenced.strip_suffix('`').unwrap_or(unfenced);

    unfenced.trim().to_string()
}

/// Read `usage`, accepting both `prompt_tokens`/`completion_tokens` and
/// `input_tokens`/`output_tokens`.
fn extract_usage(value: &Value) -> Option<Usage> {
    let usage = value.get("usage").filter(|usage| usage.is_object())?;
    let field = |primary: &str, alternate: &str| {
        usage
            .get(primary)
            .and_then(Value::as_u64)
            .or_else(|| usage.get(alternate).and_then(Value::as_u64))
    };

    let input = field("prompt_tokens", "input_tokens");
    let output = field("completion_tokens", "output_tokens");
    if input.is_none() && output.is_none() {
        return None;
    }

    Some(Usage {
        input_tokens: input.unwrap_or(0),
        output_tokens: output.unwrap_or(0),
    })
}
