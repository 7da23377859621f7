//! LLM interaction: send the tagging prompt to an OpenRouter-compatible
//! chat-completions endpoint and hand back the raw reply.
//!
//! This module is deliberately thin. Prompt wording lives in
//! [`crate::prompts`]; interpreting the reply is the job of
//! [`crate::pipeline::resolve`].
//!
//! One request per document, no client-side timeout and no retry: a failed
//! call fails the autotag step for that document only, and the upload loop
//! falls back to the manual tags.

use crate::config::IngestConfig;
use crate::error::{truncate_body, AutotagError};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

/// Path of the chat-completions call, resolved against the endpoint origin.
const CHAT_COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

/// Sent as `HTTP-Referer` for OpenRouter app attribution.
const APP_REFERER: &str = "https://github.com/Nyokinokonoko/papra-ingest-tool";
/// Sent as `X-Title` for OpenRouter app attribution.
const APP_TITLE: &str = "Papra Ingest Tool";

/// Sampling temperature; tags should be reproducible.
pub const TEMPERATURE: f32 = 0.0;
/// Upper bound on completion tokens. Reasoning models spend most of it
/// thinking before they answer.
pub const MAX_TOKENS: u32 = 5000;

/// How much of the raw reply to show in debug logs.
const REPLY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Client for a single OpenRouter account and model.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Build a client from the configuration.
    ///
    /// Fails with [`AutotagError::Configuration`] when no API key is set, so
    /// that a missing key is reported before any file or network I/O.
    pub fn from_config(config: &IngestConfig) -> Result<Self, AutotagError> {
        let api_key = config
            .openrouter_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AutotagError::Configuration)?
            .to_string();

        let url = chat_completions_url(&config.openrouter_endpoint)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(AutotagError::Transport)?;

        Ok(Self {
            http,
            url,
            api_key,
            model: config.openrouter_model_name.clone(),
        })
    }

    /// The fully resolved request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the parsed reply.
    pub async fn complete(&self, prompt: &str) -> Result<serde_json::Value, AutotagError> {
        let body = build_request(&self.model, prompt);

        debug!("Sending {} prompt chars to {}", prompt.chars().count(), self.model);
        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(AutotagError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(AutotagError::Transport)?;

        if !status.is_success() {
            return Err(AutotagError::LlmApi {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        debug!(
            "LLM response received: {}",
            text.chars().take(REPLY_PREVIEW_CHARS).collect::<String>()
        );
        serde_json::from_str(&text).map_err(AutotagError::InvalidJson)
    }
}

fn build_request<'a>(model: &'a str, prompt: &'a str) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Resolve the chat-completions URL against `endpoint`.
///
/// The path is absolute, so only the scheme, host and port of the endpoint
/// survive: `https://openrouter.ai/api/v1` and `https://openrouter.ai` both
/// resolve to `https://openrouter.ai/api/v1/chat/completions`.
pub fn chat_completions_url(endpoint: &str) -> Result<Url, AutotagError> {
    let invalid = |detail: String| AutotagError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        detail,
    };
    let base = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    base.join(CHAT_COMPLETIONS_PATH)
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_key(key: Option<&str>) -> IngestConfig {
        IngestConfig {
            openrouter_api_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(build_request("openai/gpt-5-nano", "hello")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "openai/gpt-5-nano",
                "messages": [{ "role": "user", "content": "hello" }],
                "temperature": 0.0,
                "max_tokens": 5000
            })
        );
    }

    #[test]
    fn url_keeps_only_origin() {
        for endpoint in [
            "https://openrouter.ai/api/v1",
            "https://openrouter.ai",
            "https://openrouter.ai/some/other/path/",
        ] {
            assert_eq!(
                chat_completions_url(endpoint).unwrap().as_str(),
                "https://openrouter.ai/api/v1/chat/completions"
            );
        }
        assert_eq!(
            chat_completions_url("http://localhost:8080/v1").unwrap().as_str(),
            "http://localhost:8080/api/v1/chat/completions"
        );
    }

    #[test]
    fn url_rejects_garbage() {
        assert!(matches!(
            chat_completions_url("not a url"),
            Err(AutotagError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        assert!(matches!(
            OpenRouterClient::from_config(&config_with_key(None)),
            Err(AutotagError::Configuration)
        ));
        assert!(matches!(
            OpenRouterClient::from_config(&config_with_key(Some("   "))),
            Err(AutotagError::Configuration)
        ));
    }

    #[test]
    fn client_uses_configured_model() {
        let client = OpenRouterClient::from_config(&config_with_key(Some("sk-test"))).unwrap();
        assert_eq!(client.model(), "openai/gpt-5-nano");
        assert_eq!(
            client.url().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
