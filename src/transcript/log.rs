use super::TranscriptUpdate;

/// Finalized lines only; this is the context handed to the coach
#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    lines: Vec<String>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finalized update. Returns `true` if a line was appended.
    pub fn record(&mut self, update: &TranscriptUpdate) -> bool {
        if !update.is_final {
            return false;
        }
        self.lines
            .push(format!("{}: {}", update.role.prefix(), update.text));
        true
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-joined transcript
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
