//! ModelClient - one prompt in, one completion out
//!
//! Talks to a locally reachable inference endpoint. There is no conversation
//! state: every call is a single stateless completion. Two wire protocols are
//! supported, selected once per process:
//!
//! - OpenAI-compatible `POST {base_url}/chat/completions` (LM Studio, vLLM, ...)
//! - Ollama `POST {base_url}/api/chat`
//!
//! Failures are split into [`ModelError::Unreachable`] (connect errors and
//! timeouts) and [`ModelError::BadResponse`] (non-2xx or unusable payloads).
//! No retries happen here.

use async_trait::async_trait;
use std::time::Duration;

mod ollama;
mod openai;

/// Upstream bodies quoted in error messages are cut to this many characters.
pub const ERROR_BODY_LIMIT: usize = 2000;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model endpoint unreachable ({url}): {reason}")]
    Unreachable { url: String, reason: String },
    #[error("bad response from model endpoint ({url}): {reason}")]
    BadResponse { url: String, reason: String },
}

/// System + user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Request one completion from `model` at `base_url`.
    async fn complete(
        &self,
        base_url: &str,
        model: &str,
        prompt: &Prompt,
    ) -> Result<String, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProtocol {
    OpenAiCompatible,
    Ollama,
}

impl ModelProtocol {
    pub fn from_env(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" | "lmstudio" => Ok(Self::OpenAiCompatible),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow::anyhow!(
                "Invalid MODEL_PROTOCOL '{other}'. Expected 'openai' or 'ollama'"
            )),
        }
    }

    fn endpoint(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::OpenAiCompatible => format!("{base}/chat/completions"),
            Self::Ollama => format!("{base}/api/chat"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelClientOptions {
    pub protocol: ModelProtocol,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl Default for ModelClientOptions {
    fn default() -> Self {
        Self {
            protocol: ModelProtocol::OpenAiCompatible,
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

/// reqwest-backed [`ModelClient`].
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    client: reqwest::Client,
    options: ModelClientOptions,
}

impl HttpModelClient {
    pub fn new(options: ModelClientOptions) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(
        &self,
        base_url: &str,
        model: &str,
        prompt: &Prompt,
    ) -> Result<String, ModelError> {
        let url = self.options.protocol.endpoint(base_url);
        let payload = match self.options.protocol {
            ModelProtocol::OpenAiCompatible => serde_json::to_value(openai::build_request(
                model,
                prompt,
                self.options.temperature,
                self.options.max_tokens,
            )),
            ModelProtocol::Ollama => serde_json::to_value(ollama::build_request(
                model,
                prompt,
                self.options.temperature,
                self.options.max_tokens,
            )),
        }
        .map_err(|e| ModelError::BadResponse {
            url: url.clone(),
            reason: format!("failed to encode request: {e}"),
        })?;

        tracing::debug!(url = %url, model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::Unreachable {
                url: url.clone(),
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Unreachable {
                    url: url.clone(),
                    reason: describe_transport_error(&e),
                }
            } else {
                ModelError::BadResponse {
                    url: url.clone(),
                    reason: format!("failed to read body: {e}"),
                }
            }
        })?;

        if !status.is_success() {
            return Err(ModelError::BadResponse {
                url,
                reason: format!("HTTP {}: {}", status.as_u16(), truncate_text(&body)),
            });
        }

        let parsed = match self.options.protocol {
            ModelProtocol::OpenAiCompatible => openai::extract_text(&body),
            ModelProtocol::Ollama => ollama::extract_text(&body),
        };
        let text = parsed.map_err(|reason| ModelError::BadResponse {
            url: url.clone(),
            reason,
        })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ModelError::BadResponse {
                url,
                reason: format!("empty response content: {}", truncate_text(&body)),
            });
        }
        Ok(text.to_string())
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    }
}

/// Cut `text` to [`ERROR_BODY_LIMIT`] characters, marking the cut.
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(
            ModelProtocol::OpenAiCompatible.endpoint("http://127.0.0.1:1234/v1/"),
            "http://127.0.0.1:1234/v1/chat/completions"
        );
        assert_eq!(
            ModelProtocol::Ollama.endpoint("http://127.0.0.1:11434"),
            "http://127.0.0.1:11434/api/chat"
        );
    }

    #[test]
    fn test_protocol_from_env() {
        assert_eq!(
            ModelProtocol::from_env("OpenAI").unwrap(),
            ModelProtocol::OpenAiCompatible
        );
        assert_eq!(ModelProtocol::from_env("ollama").unwrap(), ModelProtocol::Ollama);
        assert!(ModelProtocol::from_env("grpc").is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short"), "short");
        let long = "ж".repeat(ERROR_BODY_LIMIT + 5);
        let cut = truncate_text(&long);
        assert!(cut.ends_with("... (truncated)"));
        assert_eq!(
            cut.trim_end_matches("... (truncated)").chars().count(),
            ERROR_BODY_LIMIT
        );
    }
}
