//! Configuration for the integration layer
//!
//! Provides centralized configuration for all components. The same structure
//! can be loaded from a TOML file; API keys only ever come from the
//! environment.

use crate::llm::config::CompletionConfig;
use crate::llm::prompts::{FALLBACK_REPLY, GREETING};
use crate::speech::commands::{default_commands, CommandMatcher, VoiceCommand};
use crate::speech::provider::{RecognitionOptions, VoiceSettings};
use crate::{BabbleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for the complete assistant
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Chat completion configuration
    pub completion: CompletionConfig,

    /// Speech capture options
    pub recognition: RecognitionOptions,

    /// Speech playback parameters
    pub voice: VoiceSettings,

    /// Ordered voice command grammar
    pub commands: Vec<VoiceCommand>,

    /// Assistant message that opens each session
    pub greeting: Option<String>,

    /// Reply appended when a completion fails
    pub fallback_reply: String,

    /// Start speaking each new assistant reply automatically
    pub auto_speak: bool,

    /// Capacity of the host-facing event channel
    pub event_buffer_size: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            recognition: RecognitionOptions::default(),
            voice: VoiceSettings::default(),
            commands: default_commands(),
            greeting: Some(GREETING.to_string()),
            fallback_reply: FALLBACK_REPLY.to_string(),
            auto_speak: true,
            event_buffer_size: 100,
        }
    }
}

impl AssistantConfig {
    /// Default location: `<config dir>/babble/assistant.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("babble").join("assistant.toml"))
    }

    /// Parse a TOML document and apply environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.completion = config.completion.with_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded assistant configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the default path, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::from_env())
            }
        }
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.completion = config.completion.with_env_overrides();
        config
    }

    /// Set the completion configuration
    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Replace the voice command grammar
    pub fn with_commands(mut self, commands: Vec<VoiceCommand>) -> Self {
        self.commands = commands;
        self
    }

    /// Set the voice parameters
    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Set the recognition options
    pub fn with_recognition(mut self, recognition: RecognitionOptions) -> Self {
        self.recognition = recognition;
        self
    }

    /// Set the opening message
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Start sessions with an empty log
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    /// Leave replies silent until the user asks for playback
    pub fn without_auto_speak(mut self) -> Self {
        self.auto_speak = false;
        self
    }

    /// Compile the command grammar
    pub fn command_matcher(&self) -> Result<CommandMatcher> {
        CommandMatcher::new(self.commands.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.completion.validate()?;
        self.voice.validate()?;
        self.command_matcher()?;

        if self.recognition.locale.trim().is_empty() {
            return Err(BabbleError::ConfigError(
                "recognition locale is required".to_string(),
            ));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(BabbleError::ConfigError(
                "fallback reply must not be empty".to_string(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(BabbleError::ConfigError(
                "event buffer size must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
