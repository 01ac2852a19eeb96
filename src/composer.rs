//! Composer: the pending-input draft and its submit gate.

/// Draft text plus the transient composing flag.
///
/// The composing flag only drives a local "Typing…" indicator; it is never
/// transmitted to other participants.
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    composing: bool,
}

impl Composer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft text, untrimmed.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Set the draft and raise the composing flag.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.composing = true;
    }

    /// The sendable form of the draft: trimmed, and only if non-empty.
    /// Does not mutate; the draft is cleared only on confirmed send success.
    #[must_use]
    pub fn submission(&self) -> Option<&str> {
        let trimmed = self.draft.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Clear the draft and the composing flag (send confirmed).
    pub fn clear(&mut self) {
        self.draft.clear();
        self.composing = false;
    }
}
