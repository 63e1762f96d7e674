//! LLM provider calls, prompt construction and response handling.

pub mod pricing;
pub mod prompt;
pub mod provider;
pub mod request;
pub mod response;

pub use pricing::{estimate_cost, format_duration, format_stats, pricing_for};
pub use prompt::{build_user_prompt, interpolate, truncate_diff};
pub use provider::{MessageProvider, Provider, ProviderAdapter};
pub use request::{ChatRequest, is_reasoning_model};
pub use response::{Completion, Usage, parse_completion};

#[cfg(test)]
pub use provider::MockMessageProvider;
