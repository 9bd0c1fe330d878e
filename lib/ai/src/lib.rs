//! Model access and the tool-calling agent loop for Jupiter.
//!
//! - **Model Client**: [`ModelClient`] and its OpenAI-compatible adapter,
//!   with bounded retry for transient failures
//! - **Agent**: the loop that alternates model calls and tool execution
//!   until the model answers

pub mod agent;
pub mod backend;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod retry;

pub use agent::{Agent, AgentConfig, AgentOutcome, AgentState, FAILED_TURN_PREFIX, TurnOutcome};
pub use backend::ModelClient;
pub use error::{AgentError, LlmError};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use retry::RetryPolicy;
