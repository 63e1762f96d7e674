//! gitscribe - A CLI tool that generates commit messages from staged changes.
//!
//! # Overview
//!
//! gitscribe reads the staged diff with `git`, sends it to an LLM provider
//! (GitHub Copilot or OpenAI) through `curl`, and returns a cleaned-up
//! commit message. Copilot secrets are exchanged for short-lived access
//! tokens that are cached and shared between concurrent generations, so
//! only one exchange is in flight at a time.

pub mod auth;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod http;
pub mod llm;
pub mod progress;

// Re-export commonly used types
pub use commit::{GenerationResult, Generator};
pub use config::{Config, CostDisplay, PartialConfig};
pub use error::{AuthError, ConfigError, DiffError, ProviderError, TransportError};
pub use llm::{Provider, Usage};
pub use progress::FinishKind;
