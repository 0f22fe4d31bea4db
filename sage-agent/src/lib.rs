//! # Sage Agent
//!
//! The conversation loop that turns a natural-language task into tool
//! executions:
//! 1. User provides a task description
//! 2. LLM responds, possibly with `TOOL_CALL:` invocations
//! 3. Tools run and their results are fed back into the conversation
//! 4. Repeat until the LLM answers without tool calls, or the iteration
//!    cap is reached
//!
//! Also hosts the single-shot helpers (clarification, code review,
//! action explanations) and the markdown learning log.

mod agent;
mod learn_log;

pub use agent::{Agent, AgentConfig, Clarification, CriticReview};
pub use learn_log::LearnLog;
