//! Model Provider Abstraction
//!
//! Uniform chat-completion interface over the language-model services that
//! back generators and the provider quality gate: OpenAI-compatible endpoints
//! (OpenAI, Ollama, local servers) and Anthropic.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod profile;

pub use profile::{ProviderConfig, ProviderType};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: None,
            top_p: None,
            stop: None,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn map_status_error(status: reqwest::StatusCode, body: String) -> ApiError {
    match status.as_u16() {
        401 | 403 => ApiError::ProviderAuthFailed(format!("Authentication failed: {}", body)),
        429 => ApiError::ProviderRateLimit(format!("Rate limit exceeded: {}", body)),
        _ => ApiError::ProviderRequestFailed(format!("Request failed ({}): {}", status, body)),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status_error(status, body))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatibleClient {
    client: Client,
    provider_name: String,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        provider_name: String,
        model: String,
        api_key: Option<String>,
        base_url: String,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            provider_name,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .into_iter()
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop,
            stream: false,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = ensure_success(builder.send().await.map_err(map_http_error)?).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ProviderError("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: completion.model,
            usage: completion.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic messages API client
pub struct AnthropicClient {
    client: Client,
    provider_name: String,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        provider_name: String,
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            provider_name,
            model,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.anthropic.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let mut system_parts = Vec::new();
        let mut wire = Vec::new();
        for message in messages {
            match message.role {
                MessageRole::System => system_parts.push(message.content),
                role => wire.push(WireMessage {
                    role: role.as_str().to_string(),
                    content: message.content,
                }),
            }
        }

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: options.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            messages: wire,
            temperature: options.temperature,
            top_p: options.top_p,
            stop_sequences: options.stop,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;
        let content = parsed
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            usage,
            finish_reason: parsed.stop_reason,
        })
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds clients from provider configuration.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        name: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let model = config.model.clone();
        match config.provider_type {
            ProviderType::OpenAI => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    ApiError::ProviderNotConfigured(format!(
                        "Provider '{}' requires an API key (api_key or OPENAI_API_KEY)",
                        name
                    ))
                })?;
                let base_url = config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
                Ok(Arc::new(OpenAiCompatibleClient::new(
                    name.to_string(),
                    model,
                    Some(api_key),
                    base_url,
                )?))
            }
            ProviderType::Anthropic => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    ApiError::ProviderNotConfigured(format!(
                        "Provider '{}' requires an API key (api_key or ANTHROPIC_API_KEY)",
                        name
                    ))
                })?;
                Ok(Arc::new(AnthropicClient::new(
                    name.to_string(),
                    model,
                    api_key,
                    config.endpoint.clone(),
                )?))
            }
            ProviderType::Ollama => {
                let base_url = config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434/v1".to_string());
                Ok(Arc::new(OpenAiCompatibleClient::new(
                    name.to_string(),
                    model,
                    None,
                    base_url,
                )?))
            }
            ProviderType::LocalCustom => {
                let endpoint = config.endpoint.clone().ok_or_else(|| {
                    ApiError::ProviderNotConfigured(format!(
                        "Provider '{}' of type local_custom requires an endpoint",
                        name
                    ))
                })?;
                Ok(Arc::new(OpenAiCompatibleClient::new(
                    name.to_string(),
                    model,
                    config.resolve_api_key(),
                    endpoint,
                )?))
            }
        }
    }
}

/// Extract the first JSON object from a model reply.
///
/// Replies are often wrapped in prose or a fenced code block; the outermost
/// balanced `{...}` span is parsed.
pub fn extract_json_object(text: &str) -> Result<Value, ApiError> {
    let start = text
        .find('{')
        .ok_or_else(|| ApiError::MalformedOutput("reply contains no JSON object".to_string()))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + ch.len_utf8());
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end
        .ok_or_else(|| ApiError::MalformedOutput("reply has an unterminated JSON object".to_string()))?;
    let value: Value = serde_json::from_str(&text[start..end])
        .map_err(|e| ApiError::MalformedOutput(format!("reply is not valid JSON: {}", e)))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ApiError::MalformedOutput("reply is not a JSON object".to_string()))
    }
}
