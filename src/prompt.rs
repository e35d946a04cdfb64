//! Per-menu prompt slots.

use std::fmt;
use std::sync::Arc;

/// Renders the text of one prompt slot.
pub type PromptFn = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSlot {
    /// Shown when reading a new command line.
    Primary,
    /// Shown when reading the continuation of an incomplete line.
    Secondary,
}

/// The prompt of a menu.
#[derive(Clone)]
pub struct Prompt {
    primary: PromptFn,
    secondary: PromptFn,
}

impl Prompt {
    /// A prompt showing fixed texts.
    pub fn fixed(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        let primary = primary.into();
        let secondary = secondary.into();
        Self {
            primary: Arc::new(move || primary.clone()),
            secondary: Arc::new(move || secondary.clone()),
        }
    }

    pub fn render(&self, slot: PromptSlot) -> String {
        match slot {
            PromptSlot::Primary => (self.primary)(),
            PromptSlot::Secondary => (self.secondary)(),
        }
    }

    pub fn set(&mut self, slot: PromptSlot, render: PromptFn) {
        match slot {
            PromptSlot::Primary => self.primary = render,
            PromptSlot::Secondary => self.secondary = render,
        }
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("primary", &self.render(PromptSlot::Primary))
            .field("secondary", &self.render(PromptSlot::Secondary))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_slots_render_independently() {
        let mut prompt = Prompt::fixed("app > ", "> ");
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        prompt.set(
            PromptSlot::Primary,
            Arc::new(move || format!("[{}] > ", counter.fetch_add(1, Ordering::SeqCst))),
        );

        assert_eq!(prompt.render(PromptSlot::Primary), "[0] > ");
        assert_eq!(prompt.render(PromptSlot::Primary), "[1] > ");
        assert_eq!(prompt.render(PromptSlot::Secondary), "> ");
    }
}
