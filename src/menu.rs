//! Menus: switchable bundles of commands, histories, interrupt handlers and prompt.

use crate::command::{CommandSet, CommandTree};
use crate::completion::{CompleterFn, Completions};
use crate::config::Config;
use crate::console::{self, Console, Shared};
use crate::context::Context;
use crate::error::{ConsoleError, ExecError};
use crate::execute::Dispatch;
use crate::history::{FileHistory, HistorySource, MemoryHistory};
use crate::hooks;
use crate::interrupt::Interrupt;
use crate::lexer;
use crate::prompt::{Prompt, PromptSlot};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, Weak};

/// Handles an interrupt raised while reading or running a command.
pub type InterruptHandler = Arc<dyn Fn(&Console) + Send + Sync>;

type Provider = Arc<dyn Fn() -> Arc<dyn CommandTree> + Send + Sync>;

struct MenuState {
    provider: Option<Provider>,
    tree: Arc<dyn CommandTree>,
    history_names: Vec<String>,
    histories: HashMap<String, Arc<dyn HistorySource>>,
    interrupts: HashMap<Interrupt, InterruptHandler>,
    prompt: Prompt,
    completer: Option<CompleterFn>,
}

struct MenuInner {
    name: String,
    console: Weak<Shared>,
    state: RwLock<MenuState>,
}

/// A named command context of a console.
///
/// Cloning a menu gives another handle to the same menu.
#[derive(Clone)]
pub struct Menu {
    inner: Arc<MenuInner>,
}

impl Menu {
    pub(crate) fn new(name: &str, console: Weak<Shared>, config: &Config) -> Self {
        let history = if name.is_empty() {
            "local history".to_string()
        } else {
            format!("local history ({name})")
        };
        let local: Arc<dyn HistorySource> = Arc::new(MemoryHistory::new());
        Self {
            inner: Arc::new(MenuInner {
                name: name.to_string(),
                console,
                state: RwLock::new(MenuState {
                    provider: None,
                    tree: Arc::new(CommandSet::new()),
                    history_names: vec![history.clone()],
                    histories: HashMap::from([(history, local)]),
                    interrupts: HashMap::new(),
                    prompt: Prompt::fixed(
                        config.render_prompt(name),
                        config.continuation_prompt.clone(),
                    ),
                    completer: None,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether this is the active menu of its console.
    pub fn is_active(&self) -> bool {
        self.console()
            .is_some_and(|console| console.current_menu().ptr_eq(self))
    }

    /// Whether both handles refer to the same menu.
    pub fn ptr_eq(&self, other: &Menu) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn console(&self) -> Option<Console> {
        self.inner
            .console
            .upgrade()
            .map(|shared| Console { shared })
    }

    /// Sets the function generating the command tree of the menu.
    ///
    /// The tree is generated again before every read, so no parsing state leaks from
    /// one command line to the next.
    pub fn set_commands<F, T>(&self, provider: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: CommandTree + 'static,
    {
        let provider: Provider = Arc::new(move || Arc::new(provider()) as Arc<dyn CommandTree>);
        let tree = provider();
        let mut state = console::write(&self.inner.state);
        state.provider = Some(provider);
        state.tree = tree;
    }

    /// Regenerates the command tree from the provider.
    pub fn reset_commands(&self) {
        let provider = console::read(&self.inner.state).provider.clone();
        if let Some(provider) = provider {
            // Built outside the lock: providers may look at the menu.
            let tree = provider();
            console::write(&self.inner.state).tree = tree;
        }
    }

    /// The current command tree.
    pub fn tree(&self) -> Arc<dyn CommandTree> {
        console::read(&self.inner.state).tree.clone()
    }

    /// Adds a history source, or replaces the source already named `name`.
    ///
    /// Takes effect the next time the menu's histories are bound to the reader.
    pub fn add_history_source(&self, name: &str, source: impl HistorySource + 'static) {
        let mut state = console::write(&self.inner.state);
        if !state.history_names.iter().any(|n| n == name) {
            state.history_names.push(name.to_string());
        }
        state.histories.insert(name.to_string(), Arc::new(source));
    }

    /// Adds a history persisted in the file at `path`.
    pub fn add_history_file(&self, name: &str, path: impl Into<PathBuf>) -> anyhow::Result<()> {
        self.add_history_source(name, FileHistory::open(path)?);
        Ok(())
    }

    pub fn delete_history_source(&self, name: &str) {
        let mut state = console::write(&self.inner.state);
        state.history_names.retain(|n| n != name);
        state.histories.remove(name);
    }

    /// Names of the history sources, in insertion order.
    pub fn history_names(&self) -> Vec<String> {
        console::read(&self.inner.state).history_names.clone()
    }

    /// The history sources with their names, in insertion order.
    pub fn histories(&self) -> Vec<(String, Arc<dyn HistorySource>)> {
        let state = console::read(&self.inner.state);
        state
            .history_names
            .iter()
            .filter_map(|name| {
                let source = state.histories.get(name)?;
                Some((name.clone(), source.clone()))
            })
            .collect()
    }

    /// Registers `handler` for `interrupt`, replacing any previous one.
    pub fn add_interrupt(
        &self,
        interrupt: impl Into<Interrupt>,
        handler: impl Fn(&Console) + Send + Sync + 'static,
    ) {
        console::write(&self.inner.state)
            .interrupts
            .insert(interrupt.into(), Arc::new(handler));
    }

    /// Removes the handlers of `interrupts`, or all handlers if `interrupts` is empty.
    pub fn del_interrupt(&self, interrupts: &[Interrupt]) {
        let mut state = console::write(&self.inner.state);
        if interrupts.is_empty() {
            state.interrupts.clear();
        } else {
            state.interrupts.retain(|i, _| !interrupts.contains(i));
        }
    }

    /// Runs the handler registered for `interrupt`.
    ///
    /// Returns whether there was one.
    pub fn handle_interrupt(&self, console: &Console, interrupt: Interrupt) -> bool {
        let handler = console::read(&self.inner.state)
            .interrupts
            .get(&interrupt)
            .cloned();
        match handler {
            Some(handler) => {
                log::debug!("menu {:?} handles {interrupt}", self.name());
                handler(console);
                true
            }
            None => false,
        }
    }

    pub fn prompt(&self) -> Prompt {
        console::read(&self.inner.state).prompt.clone()
    }

    /// Replaces the function rendering one prompt slot.
    pub fn set_prompt(&self, slot: PromptSlot, render: impl Fn() -> String + Send + Sync + 'static) {
        console::write(&self.inner.state)
            .prompt
            .set(slot, Arc::new(render));
    }

    pub fn set_completer(&self, completer: impl Fn(&str, usize) -> Completions + Send + Sync + 'static) {
        console::write(&self.inner.state).completer = Some(Arc::new(completer));
    }

    /// Completions for `line` with the cursor at `pos`.
    pub fn complete(&self, line: &str, pos: usize) -> Completions {
        let completer = console::read(&self.inner.state).completer.clone();
        match completer {
            Some(completer) => completer(line, pos),
            None => self.complete_commands(line, pos),
        }
    }

    /// Completes command and subcommand names from the command tree.
    ///
    /// Commands hidden by the console filters are not offered.
    pub fn complete_commands(&self, line: &str, pos: usize) -> Completions {
        let head = line.get(..pos).unwrap_or(line);
        let Ok(mut path) = lexer::split(head) else {
            return Completions {
                start: pos,
                candidates: Vec::new(),
            };
        };
        if !head.is_empty() && !head.ends_with(char::is_whitespace) {
            path.pop();
        }
        let console = self.console();
        let names: Vec<String> = self
            .tree()
            .subcommands(&path)
            .into_iter()
            .filter(|target| !console.as_ref().is_some_and(|c| c.is_hidden(target)))
            .filter_map(|mut target| target.path.pop())
            .collect();
        Completions::from_words(line, pos, names.iter().map(String::as_str))
    }

    /// Runs a command in the foreground, as if it was entered at the prompt.
    ///
    /// The command tree is regenerated first.
    pub fn run_command_args(&self, ctx: &Context, args: Vec<String>) -> Result<(), ExecError> {
        let console = self.console().ok_or(ExecError::Detached)?;
        self.reset_commands();
        console.execute(ctx, self, args, Dispatch::Foreground)
    }

    /// Splits `line` into words, applies the line hooks and runs the command.
    pub fn run_command_line(&self, ctx: &Context, line: &str) -> Result<(), ConsoleError> {
        let console = self.console().ok_or(ExecError::Detached)?;
        let args = lexer::split(line)?;
        if args.is_empty() {
            return Ok(());
        }
        let args = hooks::run_line_hooks(&console.hooks().line, args).map_err(ConsoleError::LineHook)?;
        Ok(self.run_command_args(ctx, args)?)
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("name", &self.inner.name)
            .field("histories", &self.history_names())
            .finish()
    }
}
