//! Chat-completion request payloads and per-model parameter rules.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;

use crate::config::Config;

use super::prompt::build_user_prompt;

/// Models that reject `temperature` and accept `reasoning_effort`.
const REASONING_MODELS: [&str; 5] = ["o1", "o1-mini", "o3", "o3-mini", "o4-mini"];

/// The gpt-5 family: `gpt-5`, `gpt-5-mini`, `gpt-5.1`, ...
static REASONING_FAMILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gpt-5(?:[.-].*)?$").expect("Invalid regex"));

/// Whether `model` is a reasoning model.
pub fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODELS.contains(&model) || REASONING_FAMILY.is_match(model)
}

pub fn accepts_temperature(model: &str) -> bool {
    !is_reasoning_model(model)
}

pub fn accepts_reasoning_effort(model: &str) -> bool {
    is_reasoning_model(model)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a chat-completion `POST`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl ChatRequest {
    /// Build the request for `diff`, dropping parameters the model rejects.
    pub fn from_config(config: &Config, diff: &str) -> Self {
        let model = config.model.as_str();
        Self {
            model: config.model.clone(),
            messages: vec![
                ChatMessage::system(&config.system_prompt),
                ChatMessage::user(build_user_prompt(&config.prompt, diff)),
            ],
            n: 1,
            temperature: accepts_temperature(model).then_some(config.temperature),
            max_completion_tokens: config.max_tokens,
            reasoning_effort: config
                .reasoning_effort
                .clone()
                .filter(|_| accepts_reasoning_effort(model)),
        }
    }
}
