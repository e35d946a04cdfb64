//! Completion results produced by menu completers.

use std::sync::Arc;

/// Computes completions for `line` with the cursor at byte offset `pos`.
pub type CompleterFn = Arc<dyn Fn(&str, usize) -> Completions + Send + Sync>;

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text replacing the completed word.
    pub value: String,
    /// Optional text displayed next to the candidate.
    pub description: Option<String>,
}

impl Candidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn described(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: Some(description.into()),
        }
    }

    /// The text to list in a completion menu.
    pub fn display(&self) -> String {
        match &self.description {
            Some(description) => format!("{}  -- {}", self.value, description),
            None => self.value.clone(),
        }
    }
}

/// Candidates replacing the input from byte offset `start` up to the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completions {
    pub start: usize,
    pub candidates: Vec<Candidate>,
}

impl Completions {
    /// Completes the word under the cursor from a list of known words.
    pub fn from_words<'a>(
        line: &str,
        pos: usize,
        words: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let pos = pos.min(line.len());
        let head = line.get(..pos).unwrap_or(line);
        let start = head
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &head[start..];
        let candidates = words
            .into_iter()
            .filter(|word| word.starts_with(prefix))
            .map(Candidate::new)
            .collect();
        Self { start, candidates }
    }
}
