//! Configuration for the remote chat completion service

use crate::{BabbleError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable overriding the endpoint URL
pub const API_URL_ENV: &str = "BABBLE_API_URL";

/// Environment variable overriding the model
pub const MODEL_ENV: &str = "BABBLE_MODEL";

/// Configuration for the completion client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Full URL of the OpenAI-compatible chat completions endpoint
    pub api_url: String,

    /// Bearer token; never read from config files
    #[serde(skip)]
    pub api_key: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0+ = creative)
    pub temperature: f32,

    /// Maximum tokens to generate per response
    pub max_tokens: u32,

    /// Top-p (nucleus) sampling parameter
    pub top_p: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Optional instructions sent ahead of the conversation
    pub system_prompt: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
            timeout_secs: 30,
            system_prompt: None,
        }
    }
}

impl CompletionConfig {
    /// Create a new configuration with the specified model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Defaults overlaid with `GROQ_API_KEY`, `BABBLE_API_URL` and `BABBLE_MODEL`
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.api_url = url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            self.model = model;
        }
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the endpoint URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set a system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(BabbleError::ConfigError(format!(
                "completion endpoint must be an http(s) URL: {}",
                self.api_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(BabbleError::ConfigError("model is required".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(BabbleError::ConfigError(format!(
                "temperature {} out of range 0..=2",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(BabbleError::ConfigError(format!(
                "top_p {} out of range 0..=1",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(BabbleError::ConfigError("max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}
