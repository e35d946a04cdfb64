//! Callbacks run at fixed points of the read/execute cycle.

use anyhow::Result;
use std::sync::Arc;

/// A hook run before reading a line, or before/after running a command.
pub type Hook = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A hook rewriting the words of a line before it is executed.
pub type LineHook = Arc<dyn Fn(Vec<String>) -> Result<Vec<String>> + Send + Sync>;

/// The hook lists of a console, each run in registration order.
#[derive(Clone, Default)]
pub struct Hooks {
    pub pre_read: Vec<Hook>,
    pub line: Vec<LineHook>,
    pub pre_run: Vec<Hook>,
    pub post_run: Vec<Hook>,
}

/// Runs `hooks` in order, stopping at the first error.
pub fn run_all(hooks: &[Hook]) -> Result<()> {
    hooks.iter().try_for_each(|hook| hook())
}

/// Chains line hooks: each one receives the words produced by the previous one.
pub fn run_line_hooks(hooks: &[LineHook], words: Vec<String>) -> Result<Vec<String>> {
    hooks.iter().try_fold(words, |words, hook| hook(words))
}
