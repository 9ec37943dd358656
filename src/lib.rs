pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod utils;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
pub enum BabbleError {
    #[error("Speech capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Invalid playback target: {0}")]
    InvalidPlaybackTarget(Uuid),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for BabbleError {
    fn from(e: std::io::Error) -> Self {
        BabbleError::IOError(e.to_string())
    }
}

impl From<toml::de::Error> for BabbleError {
    fn from(e: toml::de::Error) -> Self {
        BabbleError::ConfigError(e.to_string())
    }
}

impl From<reqwest::Error> for BabbleError {
    fn from(e: reqwest::Error) -> Self {
        BabbleError::CompletionFailed(e.to_string())
    }
}

impl BabbleError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Assistant falls back to typed input
            BabbleError::CaptureUnavailable(_) => true,
            // Turn ends with a fallback reply
            BabbleError::CompletionFailed(_) => true,
            // Reply stays readable as text
            BabbleError::SynthesisFailed(_) => true,
            // Contract violation, rejected locally
            BabbleError::InvalidPlaybackTarget(_) => true,
            BabbleError::ConfigError(_) => false,
            BabbleError::ChannelError(_) => false,
            BabbleError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            BabbleError::CaptureUnavailable(_) => {
                "Voice input is unavailable. You can still type your messages.".to_string()
            }
            BabbleError::CompletionFailed(_) => {
                "The assistant could not respond. Please try again.".to_string()
            }
            BabbleError::SynthesisFailed(_) => {
                "Text-to-speech failed. Response will be shown as text.".to_string()
            }
            BabbleError::InvalidPlaybackTarget(_) => {
                "That message cannot be played back.".to_string()
            }
            BabbleError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            BabbleError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            BabbleError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BabbleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_errors_are_recoverable() {
        assert!(BabbleError::CaptureUnavailable("no mic".into()).is_recoverable());
        assert!(BabbleError::CompletionFailed("timeout".into()).is_recoverable());
        assert!(BabbleError::SynthesisFailed("bad text".into()).is_recoverable());
        assert!(BabbleError::InvalidPlaybackTarget(Uuid::new_v4()).is_recoverable());
        assert!(!BabbleError::ConfigError("bad".into()).is_recoverable());
        assert!(!BabbleError::ChannelError("closed".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: BabbleError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, BabbleError::IOError(_)));
        assert_eq!(err.user_message(), "File system error occurred.");
    }
}
