//! Voice command grammar and matcher
//!
//! Commands are ordered pattern/action records. A pattern is either a fixed
//! phrase, which must equal the whole transcript, or a phrase with a single
//! `*` wildcard whose fixed parts must appear as prefix and suffix. Matching
//! is case-insensitive, ignores surrounding whitespace and treats runs of
//! whitespace as one space. The first eligible command that matches wins.
//!
//! | Pattern | Action |
//! |---------|--------|
//! | "help me with *" | fill input with "Help me with {capture}" |
//! | "i need information about *" | fill input |
//! | "tell me about job opportunities" | fill input |
//! | "submit" (interim) | submit pending input |
//! | "clear" (interim) | clear pending input |

use crate::{BabbleError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a matched command does
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandAction {
    /// Replace the pending input; `{}` in the template becomes the capture
    FillInput { template: String },
    /// Submit the pending input
    Submit,
    /// Clear the pending input and transcript
    Clear,
}

impl CommandAction {
    /// Text this action writes into the input, if any
    pub fn render(&self, capture: &str) -> Option<String> {
        match self {
            CommandAction::FillInput { template } => {
                Some(template.replace("{}", capture).trim().to_string())
            }
            _ => None,
        }
    }
}

/// A configured voice command
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCommand {
    /// Phrase with at most one `*` wildcard
    pub pattern: String,

    pub action: CommandAction,

    /// Fire on interim transcripts instead of waiting for a final one
    #[serde(default)]
    pub allow_interim: bool,
}

impl VoiceCommand {
    pub fn new(pattern: impl Into<String>, action: CommandAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
            allow_interim: false,
        }
    }

    /// Allow this command to fire before the transcript is final
    pub fn interim(mut self) -> Self {
        self.allow_interim = true;
        self
    }
}

/// The stock recruitment-assistant grammar
pub fn default_commands() -> Vec<VoiceCommand> {
    vec![
        VoiceCommand::new(
            "Help me with *",
            CommandAction::FillInput {
                template: "Help me with {}".to_string(),
            },
        ),
        VoiceCommand::new(
            "I need information about *",
            CommandAction::FillInput {
                template: "I need information about {}".to_string(),
            },
        ),
        VoiceCommand::new(
            "Tell me about job opportunities",
            CommandAction::FillInput {
                template: "Tell me about job opportunities".to_string(),
            },
        ),
        VoiceCommand::new("Submit", CommandAction::Submit).interim(),
        VoiceCommand::new("Clear", CommandAction::Clear).interim(),
    ]
}

/// Result of a successful match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMatch {
    /// Pattern as configured
    pub pattern: String,
    pub action: CommandAction,
    /// Wildcard capture, empty for fixed phrases
    pub capture: String,
}

#[derive(Clone, Debug)]
enum Pattern {
    Phrase(String),
    Wildcard { prefix: String, suffix: String },
}

impl Pattern {
    fn compile(pattern: &str) -> Result<Self> {
        let normalized = normalize(pattern).to_lowercase();
        if normalized.is_empty() {
            return Err(BabbleError::ConfigError(
                "voice command pattern is empty".to_string(),
            ));
        }

        match normalized.split_once('*') {
            None => Ok(Pattern::Phrase(normalized)),
            Some((prefix, suffix)) => {
                if suffix.contains('*') {
                    return Err(BabbleError::ConfigError(format!(
                        "voice command pattern '{}' has more than one wildcard",
                        pattern
                    )));
                }
                Ok(Pattern::Wildcard {
                    prefix: prefix.trim().to_string(),
                    suffix: suffix.trim().to_string(),
                })
            }
        }
    }

    /// Returns the capture when `lower` (normalized, lowercased) matches.
    /// The capture is cut from `spoken` so it keeps the speaker's casing.
    fn capture(&self, spoken: &str, lower: &str) -> Option<String> {
        match self {
            Pattern::Phrase(phrase) => (lower == phrase).then(String::new),
            Pattern::Wildcard { prefix, suffix } => {
                if !lower.starts_with(prefix.as_str())
                    || !lower.ends_with(suffix.as_str())
                    || lower.len() < prefix.len() + suffix.len()
                {
                    return None;
                }

                let start = prefix.len();
                let end = lower.len() - suffix.len();
                let middle = &lower[start..end];

                // Fixed parts must end on word boundaries
                if !prefix.is_empty() && !middle.is_empty() && !middle.starts_with(' ') {
                    return None;
                }
                if !suffix.is_empty() && !middle.is_empty() && !middle.ends_with(' ') {
                    return None;
                }
                if middle.is_empty() && !prefix.is_empty() && !suffix.is_empty() {
                    return None;
                }

                // Lowercasing can change byte lengths outside ASCII
                let source = match (spoken_offset(spoken, start), spoken_offset(spoken, end)) {
                    (Some(from), Some(to)) => &spoken[from..to],
                    _ => middle,
                };
                Some(source.trim().to_string())
            }
        }
    }
}

/// Byte offset in `spoken` whose lowercased prefix is `lower_offset` bytes
/// long, or `None` when no char boundary lines up with it
fn spoken_offset(spoken: &str, lower_offset: usize) -> Option<usize> {
    let mut lowered = 0;
    for (index, c) in spoken.char_indices() {
        if lowered == lower_offset {
            return Some(index);
        }
        if lowered > lower_offset {
            return None;
        }
        lowered += c.to_lowercase().map(char::len_utf8).sum::<usize>();
    }
    (lowered == lower_offset).then_some(spoken.len())
}

/// Ordered, first-match-wins command matcher
#[derive(Clone, Debug)]
pub struct CommandMatcher {
    commands: Vec<(VoiceCommand, Pattern)>,
}

impl CommandMatcher {
    /// Compile a command list. Fails on empty patterns or multiple wildcards.
    pub fn new(commands: Vec<VoiceCommand>) -> Result<Self> {
        let commands = commands
            .into_iter()
            .map(|command| {
                let pattern = Pattern::compile(&command.pattern)?;
                Ok((command, pattern))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { commands })
    }

    /// A matcher that never fires
    pub fn empty() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Find the first command matching `transcript`.
    ///
    /// Commands without `allow_interim` are only considered when `is_final`.
    pub fn match_transcript(&self, transcript: &str, is_final: bool) -> Option<CommandMatch> {
        let spoken = normalize(transcript);
        if spoken.is_empty() {
            return None;
        }
        let lower = spoken.to_lowercase();

        for (command, pattern) in &self.commands {
            if !is_final && !command.allow_interim {
                continue;
            }

            if let Some(capture) = pattern.capture(&spoken, &lower) {
                debug!(
                    "Voice command '{}' matched (capture: '{}')",
                    command.pattern, capture
                );
                return Some(CommandMatch {
                    pattern: command.pattern.clone(),
                    action: command.action.clone(),
                    capture,
                });
            }
        }

        None
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
