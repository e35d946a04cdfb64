//! The console: menu registry, command filters and hook registration.

use crate::command::Target;
use crate::config::Config;
use crate::error::ConsoleError;
use crate::history::HistorySource;
use crate::hooks::Hooks;
use crate::menu::Menu;
use crate::reader::{AsyncPrinter, LineReader, RustylineReader};
use crate::signals::{OsSignals, SignalSource};
use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

/// Receives every recoverable error of the read loop.
pub type ErrorHandler = Arc<dyn Fn(&ConsoleError) + Send + Sync>;

type Logo = Arc<dyn Fn(&Console) + Send + Sync>;

pub(crate) struct State {
    pub(crate) menus: HashMap<String, Menu>,
    pub(crate) active: Menu,
    pub(crate) filters: Vec<String>,
    pub(crate) is_executing: bool,
}

pub(crate) struct Callbacks {
    pub(crate) hooks: Hooks,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) logo: Option<Logo>,
    pub(crate) signals: Arc<dyn SignalSource>,
}

/// The line reader together with the histories currently bound to it.
pub(crate) struct ReaderSlot {
    pub(crate) reader: Box<dyn LineReader>,
    pub(crate) bound: Option<Binding>,
}

pub(crate) struct Binding {
    menu: Menu,
    pub(crate) sources: Vec<(String, Arc<dyn HistorySource>)>,
}

pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) state: RwLock<State>,
    pub(crate) callbacks: RwLock<Callbacks>,
    pub(crate) reader: Mutex<ReaderSlot>,
    printer: Mutex<Option<Box<dyn AsyncPrinter>>>,
}

/// A closed-loop console application.
///
/// A console owns named [`Menu`]s, exactly one of which is active at any time. The
/// default menu is named `""` and always exists. Cloning a console gives another
/// handle to the same console.
///
/// ```no_run
/// use menu_console::{CommandSet, Config, Console};
///
/// let console = Console::new(Config::default())?;
/// console.current_menu().set_commands(|| {
///     CommandSet::new().function("hello", &[], |console, _, _| {
///         console.print("hello!");
///         Ok(())
///     })
/// });
/// console.start()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Clone)]
pub struct Console {
    pub(crate) shared: Arc<Shared>,
}

/// A console handle that doesn't keep the console alive.
#[derive(Clone)]
pub struct WeakConsole(Weak<Shared>);

impl WeakConsole {
    pub fn upgrade(&self) -> Option<Console> {
        self.0.upgrade().map(|shared| Console { shared })
    }
}

impl Console {
    /// Creates a console reading from the terminal.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_reader(config, Box::new(RustylineReader::new()?)))
    }

    /// Creates a console reading lines from `reader`.
    pub fn with_reader(config: Config, mut reader: Box<dyn LineReader>) -> Self {
        let printer = reader.async_printer();
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let default = Menu::new("", weak.clone(), &config);
            Shared {
                state: RwLock::new(State {
                    menus: HashMap::from([(String::new(), default.clone())]),
                    active: default,
                    filters: Vec::new(),
                    is_executing: false,
                }),
                callbacks: RwLock::new(Callbacks {
                    hooks: Hooks::default(),
                    error_handler: Arc::new(|err: &ConsoleError| eprintln!("{err}")),
                    logo: None,
                    signals: Arc::new(OsSignals),
                }),
                reader: Mutex::new(ReaderSlot {
                    reader,
                    bound: None,
                }),
                printer: Mutex::new(printer),
                config,
            }
        });
        let console = Self { shared };
        lock(&console.shared.reader).reader.attach(console.downgrade());
        console
    }

    pub fn downgrade(&self) -> WeakConsole {
        WeakConsole(Arc::downgrade(&self.shared))
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Creates a menu, replacing any menu with the same name.
    ///
    /// If the replaced menu was active, the new one becomes active.
    pub fn new_menu(&self, name: &str) -> Menu {
        let menu = Menu::new(name, Arc::downgrade(&self.shared), &self.shared.config);
        let mut state = write(&self.shared.state);
        if state.active.name() == name {
            state.active = menu.clone();
        }
        state.menus.insert(name.to_string(), menu.clone());
        menu
    }

    /// The menu registered under `name`.
    pub fn menu(&self, name: &str) -> Option<Menu> {
        read(&self.shared.state).menus.get(name).cloned()
    }

    /// The active menu.
    pub fn current_menu(&self) -> Menu {
        read(&self.shared.state).active.clone()
    }

    /// Makes the menu `name` active and binds its histories to the reader.
    ///
    /// Does nothing if there is no such menu or if it is already active.
    pub fn switch_menu(&self, name: &str) {
        let target = {
            let mut state = write(&self.shared.state);
            let Some(target) = state.menus.get(name).cloned() else {
                log::debug!("no menu named {name:?}");
                return;
            };
            if target.ptr_eq(&state.active) {
                return;
            }
            state.active = target.clone();
            target
        };
        log::debug!("switched to menu {name:?}");
        target.reset_commands();

        // The reader is busy while a line is being read; the read loop binds the
        // histories of the active menu before the next read anyway.
        match self.shared.reader.try_lock() {
            Ok(mut slot) => bind_histories(&mut slot, &target),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                bind_histories(&mut poisoned.into_inner(), &target)
            }
            Err(std::sync::TryLockError::WouldBlock) => {
                log::warn!("reader busy, histories of menu {name:?} bound on next read")
            }
        }
    }

    /// Hides the commands carrying any of `tags`.
    pub fn hide_commands(&self, tags: &[&str]) {
        let mut state = write(&self.shared.state);
        for tag in tags.iter().filter(|tag| !tag.is_empty()) {
            if !state.filters.iter().any(|f| f == tag) {
                state.filters.push(tag.to_string());
            }
        }
    }

    /// Shows again the commands carrying `tags`, or all commands if `tags` is empty.
    pub fn show_commands(&self, tags: &[&str]) {
        let mut state = write(&self.shared.state);
        if tags.is_empty() {
            state.filters.clear();
        } else {
            state.filters.retain(|f| !tags.contains(&f.as_str()));
        }
    }

    /// The tags currently hidden.
    pub fn filters(&self) -> Vec<String> {
        read(&self.shared.state).filters.clone()
    }

    /// Whether `target` is hidden by the current filters.
    pub fn is_hidden(&self, target: &Target) -> bool {
        let state = read(&self.shared.state);
        target.tags.iter().any(|tag| state.filters.contains(tag))
    }

    /// Whether a foreground command is running.
    pub fn is_executing(&self) -> bool {
        read(&self.shared.state).is_executing
    }

    pub fn add_pre_read_hook(&self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) {
        write(&self.shared.callbacks).hooks.pre_read.push(Arc::new(hook));
    }

    /// Adds a hook rewriting the words of every line before it is executed.
    pub fn add_line_hook(
        &self,
        hook: impl Fn(Vec<String>) -> Result<Vec<String>> + Send + Sync + 'static,
    ) {
        write(&self.shared.callbacks).hooks.line.push(Arc::new(hook));
    }

    pub fn add_pre_run_hook(&self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) {
        write(&self.shared.callbacks).hooks.pre_run.push(Arc::new(hook));
    }

    /// Adds a hook run after a command completed, in the command's own thread.
    ///
    /// Post-run hooks are skipped when the command was cancelled.
    pub fn add_post_run_hook(&self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) {
        write(&self.shared.callbacks).hooks.post_run.push(Arc::new(hook));
    }

    pub fn set_error_handler(&self, handler: impl Fn(&ConsoleError) + Send + Sync + 'static) {
        write(&self.shared.callbacks).error_handler = Arc::new(handler);
    }

    /// Replaces the source of signals monitored while commands run.
    pub fn set_signal_source(&self, signals: impl SignalSource + 'static) {
        write(&self.shared.callbacks).signals = Arc::new(signals);
    }

    /// Sets a function printing a logo when the read loop starts.
    pub fn set_logo(&self, logo: impl Fn(&Console) + Send + Sync + 'static) {
        write(&self.shared.callbacks).logo = Some(Arc::new(logo));
    }

    /// Prints a message without disturbing the prompt.
    ///
    /// While a command runs the message goes straight to stdout, otherwise it is
    /// printed above the prompt being edited.
    pub fn print(&self, msg: impl Into<String>) {
        let mut msg = msg.into();
        if !msg.ends_with('\n') {
            msg.push('\n');
        }
        if !self.is_executing() {
            if let Some(printer) = lock(&self.shared.printer).as_mut() {
                if let Err(err) = printer.print(msg) {
                    log::warn!("async print failed: {err:#}");
                }
                return;
            }
        }
        if let Err(err) = write_flushed(&mut std::io::stdout().lock(), &msg) {
            log::warn!("can't print to stdout: {err}");
        }
    }

    pub(crate) fn hooks(&self) -> Hooks {
        read(&self.shared.callbacks).hooks.clone()
    }

    pub(crate) fn signals(&self) -> Arc<dyn SignalSource> {
        read(&self.shared.callbacks).signals.clone()
    }

    pub(crate) fn report(&self, err: &ConsoleError) {
        let handler = read(&self.shared.callbacks).error_handler.clone();
        handler(err);
    }

    pub(crate) fn print_logo(&self) {
        let logo = read(&self.shared.callbacks).logo.clone();
        if let Some(logo) = logo {
            logo(self);
        }
    }

    /// Binds the histories of `menu` to the reader, unless they already are.
    pub(crate) fn bind_histories(&self, menu: &Menu) {
        bind_histories(&mut lock(&self.shared.reader), menu);
    }

    /// Appends an accepted line to the histories bound to the reader.
    pub(crate) fn record_history(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let sources = match &lock(&self.shared.reader).bound {
            Some(binding) => binding.sources.clone(),
            None => return,
        };
        for (name, source) in sources {
            if let Err(err) = source.append(line) {
                log::warn!("can't append to history {name}: {err:#}");
            }
        }
    }

    /// Marks the console as running a foreground command, until the guard is dropped.
    pub(crate) fn begin_executing(&self) -> Option<ExecutingGuard<'_>> {
        let mut state = write(&self.shared.state);
        if state.is_executing {
            return None;
        }
        state.is_executing = true;
        Some(ExecutingGuard { console: self })
    }
}

pub(crate) struct ExecutingGuard<'a> {
    console: &'a Console,
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        write(&self.console.shared.state).is_executing = false;
    }
}

fn write_flushed(out: &mut impl Write, msg: &str) -> std::io::Result<()> {
    out.write_all(msg.as_bytes())?;
    out.flush()
}

fn bind_histories(slot: &mut ReaderSlot, menu: &Menu) {
    let sources = menu.histories();
    if let Some(bound) = &slot.bound {
        let unchanged = bound.sources.len() == sources.len()
            && bound
                .sources
                .iter()
                .zip(&sources)
                .all(|((a, x), (b, y))| a == b && Arc::ptr_eq(x, y));
        if bound.menu.ptr_eq(menu) && unchanged {
            return;
        }
    }
    log::debug!("binding histories {:?} of menu {:?}", menu.history_names(), menu.name());
    slot.reader.bind_histories(&sources);
    slot.bound = Some(Binding {
        menu: menu.clone(),
        sources,
    });
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
