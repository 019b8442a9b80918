use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::generation::retry::RetryPolicy;

/// Application-level constants
pub const APP_NAME: &str = "ATF";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-request timeout for the generative backend (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of retries for transient invocation failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1:8b";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";
const DEFAULT_API_VERSION: &str = "2024-08-01-preview";

/// Whether this is a debug build.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "info,atf_lib=debug,atf=debug"
    } else {
        "warn,atf_lib=info,atf=info"
    }
}

/// Get the application data directory.
/// `ATF_DATA_DIR` overrides the default `~/ATF/`.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ATF_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite database holding documents and artifacts.
pub fn database_path() -> PathBuf {
    app_data_dir().join("database").join("atf.db")
}

/// Default directory for exported bundles.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Which generative backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    Ollama,
    /// OpenAI-compatible chat completions (Azure deployment URLs included).
    OpenAi,
}

impl LlmBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "azure" | "azure_openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

/// Runtime configuration, assembled from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub backend: LlmBackend,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Read `ATF_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("ATF_LLM_BACKEND") {
            Some(raw) => LlmBackend::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown ATF_LLM_BACKEND, using ollama");
                LlmBackend::Ollama
            }),
            None => LlmBackend::Ollama,
        };

        let base_url = lookup("ATF_LLM_URL").unwrap_or_else(|| match backend {
            LlmBackend::Ollama => DEFAULT_OLLAMA_URL.to_string(),
            LlmBackend::OpenAi => "https://api.openai.com/v1".to_string(),
        });

        let model = lookup("ATF_MODEL").unwrap_or_else(|| match backend {
            LlmBackend::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
            LlmBackend::OpenAi => DEFAULT_OPENAI_MODEL.to_string(),
        });

        Self {
            backend,
            base_url,
            model,
            api_key: lookup("ATF_API_KEY").filter(|k| !k.trim().is_empty()),
            api_version: lookup("ATF_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout_secs: parse_or_default(&lookup, "ATF_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_retries: parse_or_default(&lookup, "ATF_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            data_dir: lookup("ATF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(app_data_dir),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database").join("atf.db")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid numeric setting, using default");
            default
        }),
        None => default,
    }
}
