//! Error types for the AI crate.
//!
//! - `LlmError`: failures talking to the model provider
//! - `AgentError`: failures that end an agent run and reach the caller

use std::fmt;

/// Errors from model provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider refused us, e.g. a bad API key.
    ProviderUnavailable { provider: String, reason: String },
    /// Transport failure or server-side error; worth retrying.
    RequestFailed { reason: String },
    /// Provider rejected the request itself (4xx other than auth and 429).
    Rejected { status: u16, reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl LlmError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::Timeout | Self::RateLimited { .. }
        )
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => write!(f, "LLM request failed: {reason}"),
            Self::Rejected { status, reason } => {
                write!(f, "LLM request rejected with status {status}: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => write!(f, "invalid LLM configuration: {reason}"),
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors that end an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The model could not be reached, refused the request, or rate limited us.
    ModelUnavailable { reason: String },
    /// The model answered with something that is not a usable message.
    ModelProtocol { reason: String },
    /// The model kept requesting tools past the iteration bound.
    MaxIterationsExceeded { max: u32 },
    /// The run did not finish within its wall-clock deadline.
    DeadlineExceeded { seconds: u64 },
    /// The user message was blank.
    EmptyMessage,
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ResponseParseFailed { .. } => Self::ModelProtocol {
                reason: err.to_string(),
            },
            _ => Self::ModelUnavailable {
                reason: err.to_string(),
            },
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelUnavailable { reason } => write!(f, "model unavailable: {reason}"),
            Self::ModelProtocol { reason } => write!(f, "model protocol error: {reason}"),
            Self::MaxIterationsExceeded { max } => {
                write!(f, "agent exceeded {max} model iterations without a final answer")
            }
            Self::DeadlineExceeded { seconds } => {
                write!(f, "agent did not finish within {seconds}s")
            }
            Self::EmptyMessage => write!(f, "message must not be empty"),
        }
    }
}

impl std::error::Error for AgentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_display() {
        let err = LlmError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 30s");
        assert_eq!(
            LlmError::RateLimited {
                retry_after_secs: None
            }
            .to_string(),
            "rate limited"
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(
            LlmError::RequestFailed {
                reason: "502".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ProviderUnavailable {
                provider: "openai".to_string(),
                reason: "bad key".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ResponseParseFailed {
                reason: "eof".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn parse_failures_become_protocol_errors() {
        let err = AgentError::from(LlmError::ResponseParseFailed {
            reason: "bad tool arguments".to_string(),
        });
        assert!(matches!(err, AgentError::ModelProtocol { .. }));
        assert!(err.to_string().contains("bad tool arguments"));
    }

    #[test]
    fn transport_failures_become_unavailable() {
        for llm in [
            LlmError::Timeout,
            LlmError::RateLimited {
                retry_after_secs: None,
            },
            LlmError::Rejected {
                status: 400,
                reason: "bad".to_string(),
            },
        ] {
            assert!(matches!(
                AgentError::from(llm),
                AgentError::ModelUnavailable { .. }
            ));
        }
    }

    #[test]
    fn max_iterations_display() {
        let err = AgentError::MaxIterationsExceeded { max: 10 };
        assert!(err.to_string().contains("10 model iterations"));
    }
}
