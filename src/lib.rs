//! Closed-loop interactive consoles.
//!
//! A [`Console`] repeatedly reads a line, splits it into shell words and dispatches
//! them to the command tree of its active [`Menu`], without exiting between commands.
//! Menus are switchable bundles of commands, histories, prompts and interrupt
//! handlers; exactly one of them is active at any time.
//!
//! Commands run in their own thread under a cancellable [`Context`]. While a command
//! runs, `SIGINT`, `SIGTERM` and `SIGQUIT` cancel it and are dispatched to the
//! interrupt handlers of the menu instead of killing the process. Hooks can run
//! before each read, rewrite the words of each line, and run around each command.
//!
//! The public modules expose the building blocks: the [`lexer`], the [`command`]
//! tree contract and its [`argh`]-based implementation, [`context`]s, the
//! [`signals`] monitor and [`history`] sources.

pub mod command;
pub mod completion;
pub mod config;
mod console;
pub mod context;
mod error;
mod execute;
mod highlight;
pub mod history;
pub mod hooks;
pub mod interrupt;
pub mod lexer;
mod menu;
pub mod prompt;
pub mod reader;
mod run;
pub mod signals;

#[cfg(test)]
mod testing;

pub use command::{Command, CommandSet, CommandTree, Target};
pub use config::Config;
pub use console::{Console, ErrorHandler, WeakConsole};
pub use context::{Cause, Context};
pub use error::{ConsoleError, ExecError};
pub use execute::Dispatch;
pub use interrupt::{Interrupt, Signal};
pub use menu::{InterruptHandler, Menu};
