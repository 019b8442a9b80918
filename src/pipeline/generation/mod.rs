pub mod types;
pub mod prompt;
pub mod parser;
pub mod retry;
pub mod ollama;
pub mod openai;
pub mod mock;
pub mod coverage;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use retry::*;
pub use ollama::*;
pub use openai::*;
pub use mock::*;
pub use coverage::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::config::{AppConfig, LlmBackend};

/// Failure of a single call to the generative backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generative backend is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Backend rejected credentials (status {0})")]
    Unauthorized(u16),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model '{0}' is not available on the backend")]
    NoModelAvailable(String),
}

impl GenerationError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::HttpClient(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Unauthorized(_) | Self::ResponseParsing(_) | Self::NoModelAvailable(_) => false,
        }
    }
}

/// Build the backend client the configuration points at.
pub fn client_from_config(
    config: &AppConfig,
) -> Result<Box<dyn LlmClient + Send + Sync>, GenerationError> {
    match config.backend {
        LlmBackend::Ollama => Ok(Box::new(OllamaClient::new(
            &config.base_url,
            config.timeout_secs,
        )?)),
        LlmBackend::OpenAi => Ok(Box::new(OpenAiClient::new(
            &config.base_url,
            config.api_key.clone(),
            &config.api_version,
            config.timeout_secs,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GenerationError::Timeout(30).is_transient());
        assert!(GenerationError::Connection("http://x".into()).is_transient());
        assert!(GenerationError::Upstream { status: 503, body: String::new() }.is_transient());
        assert!(GenerationError::Upstream { status: 429, body: String::new() }.is_transient());
        assert!(!GenerationError::Upstream { status: 400, body: String::new() }.is_transient());
        assert!(!GenerationError::Unauthorized(401).is_transient());
        assert!(!GenerationError::ResponseParsing("eof".into()).is_transient());
    }

    #[test]
    fn client_follows_configured_backend() {
        let config = AppConfig::from_lookup(|key| match key {
            "ATF_LLM_BACKEND" => Some("openai".to_string()),
            "ATF_DATA_DIR" => Some("/tmp/atf".to_string()),
            _ => None,
        });
        assert!(client_from_config(&config).is_ok());

        let config = AppConfig::from_lookup(|key| match key {
            "ATF_DATA_DIR" => Some("/tmp/atf".to_string()),
            _ => None,
        });
        assert!(client_from_config(&config).is_ok());
    }
}
