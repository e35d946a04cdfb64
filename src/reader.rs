//! Line readers feeding the read loop.

use crate::console::WeakConsole;
use crate::highlight;
use crate::history::HistorySource;
use crate::interrupt::Interrupt;
use crate::lexer;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, ExternalPrinter, Helper};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

/// Why no line was read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Reading was interrupted by the user (Ctrl-C, Ctrl-D).
    #[error("read interrupted: {0}")]
    Interrupted(Interrupt),
    /// The reader can't be used anymore.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Prints messages above the prompt while a line is being read.
pub trait AsyncPrinter: Send {
    fn print(&mut self, msg: String) -> anyhow::Result<()>;
}

/// The blocking input side of a console.
pub trait LineReader: Send {
    /// Called once the reader is owned by its console.
    fn attach(&mut self, _console: WeakConsole) {}

    /// Blocks until a line is entered.
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError>;

    /// Replaces the history offered while reading with the entries of `histories`.
    fn bind_histories(&mut self, histories: &[(String, Arc<dyn HistorySource>)]);

    /// A printer usable from other threads, if the reader supports one.
    fn async_printer(&mut self) -> Option<Box<dyn AsyncPrinter>> {
        None
    }
}

/// Terminal line reader backed by [`rustyline`].
pub struct RustylineReader {
    editor: Editor<ConsoleHelper, DefaultHistory>,
}

impl RustylineReader {
    pub fn new() -> anyhow::Result<Self> {
        let editor = Editor::new()?;
        Ok(Self { editor })
    }
}

impl LineReader for RustylineReader {
    fn attach(&mut self, console: WeakConsole) {
        self.editor.set_helper(Some(ConsoleHelper { console }));
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        log::warn!("can't add history entry: {err}");
                    }
                }
                Ok(line)
            }
            Err(ReadlineError::Interrupted) => Err(ReadError::Interrupted(Interrupt::CtrlC)),
            Err(ReadlineError::Eof) => Err(ReadError::Interrupted(Interrupt::Eof)),
            Err(err) => Err(ReadError::Fatal(err.into())),
        }
    }

    fn bind_histories(&mut self, histories: &[(String, Arc<dyn HistorySource>)]) {
        if let Err(err) = self.editor.clear_history() {
            log::warn!("can't clear history: {err}");
        }
        for (name, source) in histories {
            for entry in source.entries() {
                if let Err(err) = self.editor.add_history_entry(entry) {
                    log::warn!("can't load history {name}: {err}");
                    break;
                }
            }
        }
    }

    fn async_printer(&mut self) -> Option<Box<dyn AsyncPrinter>> {
        match self.editor.create_external_printer() {
            Ok(printer) => Some(Box::new(Printer(printer))),
            Err(err) => {
                log::debug!("no external printer: {err}");
                None
            }
        }
    }
}

struct Printer<P>(P);

impl<P: ExternalPrinter + Send> AsyncPrinter for Printer<P> {
    fn print(&mut self, msg: String) -> anyhow::Result<()> {
        Ok(self.0.print(msg)?)
    }
}

/// Completion, highlighting and multi-line validation for the rustyline editor.
///
/// Everything is resolved against the active menu of the console at the time of the
/// keystroke.
pub struct ConsoleHelper {
    console: WeakConsole,
}

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some(console) = self.console.upgrade() else {
            return Ok((pos, Vec::new()));
        };
        let completions = console.current_menu().complete(line, pos);
        let pairs = completions
            .candidates
            .iter()
            .map(|candidate| Pair {
                display: candidate.display(),
                replacement: candidate.value.clone(),
            })
            .collect();
        Ok((completions.start, pairs))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match self.console.upgrade() {
            Some(console) => Cow::Owned(highlight::highlight(&console, line)),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Validator for ConsoleHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        // Dangling quotes and escapes continue on the next line.
        Ok(match lexer::tokenize(ctx.input()) {
            Ok(_) => ValidationResult::Valid(None),
            Err(_) => ValidationResult::Incomplete,
        })
    }
}
