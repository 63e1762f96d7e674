//! Error types for gitscribe modules using thiserror.
//!
//! The `Display` strings double as the user-facing failure messages that the
//! generator reports, so keep them short and actionable.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading and merging configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown provider '{0}'. Expected one of: copilot, openai")]
    UnknownProvider(String),

    #[error("Unknown cost display mode '{0}'. Expected one of: off, compact, verbose")]
    UnknownCostDisplay(String),
}

/// Errors from collecting the staged diff.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Failed to get git diff: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Failed to get git diff: could not run git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git not found. Install git and make sure it is on PATH")]
    NotInstalled,
}

/// Errors from the HTTP-capable subprocess.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("curl not found. Install curl and make sure it is on PATH")]
    NotInstalled,

    #[error("Failed to spawn curl: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("HTTP request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP request failed (curl exit code {code}): {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

/// Errors from resolving a secret or exchanging it for an access token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no secret")]
    NoSecret,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("parse error")]
    Parse,

    #[error("token exchange rejected: {0}")]
    Rejected(String),
}

/// Errors from a provider call, from credential lookup to response parsing.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(
        "GitHub Copilot is not authenticated. Sign in to Copilot from your editor \
         (this writes github-copilot/hosts.json) or set GITHUB_COPILOT_TOKEN"
    )]
    NotAuthenticated,

    #[error("OPENAI_API_KEY is not set. Export your OpenAI API key to use the openai provider")]
    MissingApiKey,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Api(String),

    #[error("unexpected response format")]
    UnexpectedFormat,

    #[error("The model returned an empty commit message")]
    EmptyMessage,

    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),
}
