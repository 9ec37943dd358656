//! OpenAI-compatible chat completions over HTTP
//!
//! Talks to Groq by default; any server exposing the same
//! `/chat/completions` shape works.

use crate::llm::client::ChatCompletionClient;
use crate::llm::config::CompletionConfig;
use crate::llm::context::ChatMessage;
use crate::llm::prompts::or_apology;
use crate::{BabbleError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's content, substituting the apology when absent
fn extract_completion(body: &str) -> Result<String> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| BabbleError::CompletionFailed(format!("malformed response: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);

    if content.is_none() {
        warn!("Completion response had no content");
    }
    Ok(or_apology(content))
}

/// HTTP client for an OpenAI-compatible completions endpoint
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    config: CompletionConfig,
}

impl GroqClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        config.validate()?;
        if !config.has_api_key() {
            warn!("No API key configured; completion requests will likely be rejected");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BabbleError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Prepend the configured system prompt, if any
    fn with_system_prompt(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        match self.config.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => {
                let mut full = vec![ChatMessage::system(prompt)];
                full.extend(messages);
                full
            }
            _ => messages,
        }
    }
}

#[async_trait]
impl ChatCompletionClient for GroqClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let messages = self.with_system_prompt(messages);
        let request = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
        };

        debug!(
            "Requesting completion from {} ({} messages)",
            self.config.model,
            messages.len()
        );
        let start_time = Instant::now();

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BabbleError::CompletionFailed(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let completion = extract_completion(&body)?;
        info!(
            "Completion received: {} chars in {}ms",
            completion.len(),
            start_time.elapsed().as_millis()
        );
        Ok(completion)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
