//! Live transcript produced by speech capture

/// Holds the latest, possibly partial, recognition text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscriptBuffer {
    text: String,
    is_final: bool,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered text with a newer recognition result
    pub fn update(&mut self, text: impl Into<String>, is_final: bool) {
        self.text = text.into();
        self.is_final = is_final;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.is_final = false;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the recognizer has committed to the current text
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
