//! Provider selection and the chat-completion call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::auth::store::non_empty_env;
use crate::auth::{ACCESS_TOKEN_ENV, CredentialCache, SecretResolver, TokenExchange};
use crate::config::Config;
use crate::error::{ConfigError, ProviderError};
use crate::http::{EDITOR_VERSION, HttpRequest, HttpTransport, USER_AGENT};

use super::request::ChatRequest;
use super::response::{Completion, parse_completion};

/// API key for the direct OpenAI provider.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const COPILOT_CHAT_URL: &str = "https://api.githubcopilot.com/chat/completions";

const COPILOT_INTEGRATION_ID: &str = "vscode-chat";

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// GitHub Copilot; exchanges a long-lived secret for access tokens.
    #[default]
    Copilot,
    /// OpenAI with an API key.
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Copilot => "copilot",
            Provider::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "copilot" => Ok(Provider::Copilot),
            "openai" => Ok(Provider::OpenAi),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Capability to turn a diff into a commit message.
///
/// This abstraction allows replacing the provider in generator tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageProvider: Send + Sync {
    async fn call(&self, config: &Config, diff: &str) -> Result<Completion, ProviderError>;
}

/// Where and how to send the completion request.
struct Target {
    url: String,
    token: String,
}

/// Calls the configured provider over an [`HttpTransport`].
#[derive(Clone)]
pub struct ProviderAdapter {
    transport: Arc<dyn HttpTransport>,
    exchange: TokenExchange,
    secrets: SecretResolver,
    openai_url: String,
    copilot_url: String,
}

impl ProviderAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<CredentialCache>) -> Self {
        Self {
            exchange: TokenExchange::new(transport.clone(), cache),
            transport,
            secrets: SecretResolver::new(),
            openai_url: OPENAI_CHAT_URL.to_string(),
            copilot_url: COPILOT_CHAT_URL.to_string(),
        }
    }

    /// Resolve secrets with a custom resolver (e.g. other search dirs).
    pub fn with_secret_resolver(mut self, secrets: SecretResolver) -> Self {
        self.secrets = secrets;
        self
    }

    /// Replace the token exchange (e.g. a different endpoint or wait bound).
    pub fn with_exchange(mut self, exchange: TokenExchange) -> Self {
        self.exchange = exchange;
        self
    }

    async fn copilot_target(&self) -> Result<Target, ProviderError> {
        if let Some(token) = non_empty_env(ACCESS_TOKEN_ENV) {
            debug!("Using {} directly", ACCESS_TOKEN_ENV);
            return Ok(Target {
                url: self.copilot_url.clone(),
                token,
            });
        }

        let secret = self
            .secrets
            .resolve_secret(self.exchange.cache())
            .ok_or(ProviderError::NotAuthenticated)?;

        let access = self.exchange.exchange(&secret).await?;
        let url = access
            .api_endpoint()
            .map(|api| format!("{}/chat/completions", api.trim_end_matches('/')))
            .unwrap_or_else(|| self.copilot_url.clone());

        Ok(Target {
            url,
            token: access.token,
        })
    }

    fn openai_target(&self) -> Result<Target, ProviderError> {
        let token = non_empty_env(OPENAI_API_KEY_ENV).ok_or(ProviderError::MissingApiKey)?;
        Ok(Target {
            url: self.openai_url.clone(),
            token,
        })
    }

    fn build_request(
        provider: Provider,
        target: &Target,
        payload: &ChatRequest,
    ) -> Result<HttpRequest, ProviderError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ProviderError::SerializationFailed(e.to_string()))?;

        let request = HttpRequest::post(&target.url, body)
            .header("Authorization", format!("Bearer {}", target.token))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);

        Ok(match provider {
            Provider::Copilot => request
                .header("Copilot-Integration-Id", COPILOT_INTEGRATION_ID)
                .header("Editor-Version", EDITOR_VERSION),
            Provider::OpenAi => request,
        })
    }
}

#[async_trait]
impl MessageProvider for ProviderAdapter {
    async fn call(&self, config: &Config, diff: &str) -> Result<Completion, ProviderError> {
        let target = match config.provider {
            Provider::Copilot => self.copilot_target().await?,
            Provider::OpenAi => self.openai_target()?,
        };

        let payload = ChatRequest::from_config(config, diff);
        let request = Self::build_request(config.provider, &target, &payload)?;

        debug!(
            "Requesting {} completion from {} with model {}",
            config.provider, target.url, config.model
        );

        let body = self.transport.send(&request).await?.into_body()?;
        parse_completion(&body)
    }
}
