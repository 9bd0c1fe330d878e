//! Server configuration.
//!
//! Loaded via the `config` crate from environment variables, after any
//! `.env` file has been applied. Nested sections use a double underscore,
//! e.g. `AGENT__MAX_ITERATIONS=5` or `MODEL__NAME=gpt-4o`.

use jupiter_ai::{AgentConfig, OpenAiConfig};
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// API key for the model provider (`OPENAI_API_KEY`). Required.
    pub openai_api_key: String,

    /// Model provider settings.
    #[serde(default)]
    pub model: OpenAiConfig,

    /// Agent loop limits.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Retrieval tool settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Web session and upload settings.
    #[serde(default)]
    pub server: WebConfig,
}

/// Retrieval tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// `top_k` used when the model does not pass one.
    #[serde(default = "default_top_k")]
    pub default_top_k: u64,
}

fn default_top_k() -> u64 {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
        }
    }
}

/// Web session and upload settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    #[serde(default)]
    pub secure_cookies: bool,

    /// Largest accepted PDF upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Sessions idle for longer than this are dropped.
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,

    /// Interval between session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_session_idle_minutes() -> i64 {
    120
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            secure_cookies: false,
            max_upload_bytes: default_max_upload_bytes(),
            session_idle_minutes: default_session_idle_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is missing or a value is invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_builder(config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        if config.openai_api_key.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "OPENAI_API_KEY must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("openai_api_key", "sk-test")
            .expect("override")
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = ServerConfig::from_builder(with_key()).expect("config");

        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
        assert!(!config.server.secure_cookies);
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = ServerConfig::from_builder(config::Config::builder()).unwrap_err();
        assert!(err.to_string().contains("openai_api_key"));
    }

    #[test]
    fn blank_key_is_fatal() {
        let builder = config::Config::builder()
            .set_override("openai_api_key", "  ")
            .expect("override");
        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn nested_sections_override_defaults() {
        let builder = with_key()
            .set_override("agent.max_iterations", 3)
            .expect("override")
            .set_override("model.name", "gpt-4o")
            .expect("override");
        let config = ServerConfig::from_builder(builder).expect("config");

        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.max_attempts, 3);
    }
}
