//! Errors surfaced by the console and its execution controller.

use crate::context::Cause;
use crate::interrupt::Signal;
use crate::lexer::TokenizeError;
use std::io;
use thiserror::Error;

/// Why a command execution did not complete successfully.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Another foreground command is still running on this console.
    #[error("a command is already running")]
    Busy,

    /// A pre-run hook failed; the command was not dispatched.
    #[error("pre-run hook: {0:#}")]
    PreRun(anyhow::Error),

    /// The command (or a post-run hook) returned an error.
    #[error("{0:#}")]
    Command(anyhow::Error),

    /// An OS signal cancelled the command.
    #[error("command interrupted: {0}")]
    Interrupted(Signal),

    /// The execution context was cancelled or reached its deadline.
    #[error("command canceled: {0}")]
    Canceled(Cause),

    /// The signal monitor could not be installed.
    #[error("can't monitor signals")]
    Signals(#[source] io::Error),

    /// The command task could not be started.
    #[error("can't start command task")]
    Spawn(#[source] io::Error),

    /// The menu outlived the console that created it.
    #[error("menu is not attached to a console")]
    Detached,
}

/// A recoverable error reported by the read loop.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("pre-read hook: {0:#}")]
    PreRead(anyhow::Error),

    #[error("parse error: {0}")]
    Parse(#[from] TokenizeError),

    #[error("line hook: {0:#}")]
    LineHook(anyhow::Error),

    #[error(transparent)]
    Execution(#[from] ExecError),

    /// The line reader failed for good; this one ends the read loop.
    #[error("read error: {0:#}")]
    Reader(anyhow::Error),
}

impl ConsoleError {
    /// Whether the error is an interrupt rather than a failure.
    ///
    /// Interrupts are dispatched to menu handlers and never reported.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ConsoleError::Execution(ExecError::Interrupted(_)))
    }
}
