//! # Sage Core
//!
//! The tool-call protocol and supporting machinery for the sage agent.
//!
//! ## Core Concepts
//! - **Tools**: A fixed set of file/shell operations the model can request
//! - **Parser**: Extracts `TOOL_CALL:` invocations from free-text LLM output
//! - **Heuristics**: Pure-function classifiers over natural language
//! - **Extraction**: Best-effort JSON recovery from model responses
//! - **Provider**: Trait-based LLM communication (OpenAI, Anthropic, Google, Ollama)

pub mod config;
pub mod extract;
pub mod heuristics;
pub mod parse;
pub mod provider;
pub mod tools;

pub use config::Settings;
pub use extract::extract_json_object;
pub use parse::{parse_tool_calls, ToolCall};
pub use provider::{
    AnthropicProvider, AnyProvider, ChatMessage, CompletionRequest, CompletionResponse,
    GoogleProvider, LlmProvider, OpenAIProvider, ProviderConfig, ProviderError, ProviderType,
    Role, Usage,
};
pub use tools::{AutoApprove, Confirmer, Tool, ToolRegistry};
