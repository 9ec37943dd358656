//! Fixed assistant texts

/// First message of every session
pub const GREETING: &str = "Hello! I'm your AI recruitment assistant. How can I help you today?";

/// Reply used when a completion request fails
pub const FALLBACK_REPLY: &str =
    "I'm experiencing some technical difficulties. Please try again later.";

/// Reply used when the service answers without any content
pub const EMPTY_COMPLETION_REPLY: &str =
    "I'm sorry, I couldn't generate a response. Please try again.";

/// Optional system prompt for recruitment conversations
pub const RECRUITMENT_SYSTEM_PROMPT: &str = "You are a helpful AI recruitment assistant. \
Answer questions about jobs, candidates, interviews and hiring in a friendly, concise way. \
Your replies may be read aloud, so avoid tables, code blocks and long lists.";

/// Substitute the apology text for an empty or missing completion
pub fn or_apology(completion: Option<String>) -> String {
    match completion {
        Some(text) if !text.trim().is_empty() => text,
        _ => EMPTY_COMPLETION_REPLY.to_string(),
    }
}
