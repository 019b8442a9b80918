//! OpenAI-compatible chat completions client.
//!
//! Two URL forms are supported. A plain base URL (`https://api.openai.com/v1`)
//! posts to `{base}/chat/completions` with a bearer token. An Azure resource
//! URL (`https://<name>.openai.azure.com`) posts to
//! `{base}/openai/deployments/{model}/chat/completions?api-version=...` with
//! an `api-key` header, the model name doubling as the deployment name.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{GenerationOptions, LlmClient};
use super::GenerationError;

pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    api_version: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_version: api_version.to_string(),
            client,
            timeout_secs,
        })
    }

    fn is_azure(&self) -> bool {
        self.base_url.contains(".azure.com")
    }

    fn completions_url(&self, model: &str) -> String {
        if self.is_azure() {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, model, self.api_version
            )
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient for OpenAiClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let azure = self.is_azure();
        let body = ChatRequest {
            // Azure routes by deployment in the URL
            model: (!azure).then_some(model),
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let mut request = self.client.post(self.completions_url(model)).json(&body);
        if let Some(key) = &self.api_key {
            request = if azure {
                request.header("api-key", key)
            } else {
                request.bearer_auth(key)
            };
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                GenerationError::Connection(self.base_url.clone())
            } else {
                GenerationError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GenerationError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::ResponseParsing("response has no choices".into()))
    }
}
