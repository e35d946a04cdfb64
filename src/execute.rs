//! The execution controller: runs one command under a cancellable context, racing its
//! completion against OS signals.

use crate::console::{self, Console};
use crate::context::{Cause, Context};
use crate::error::ExecError;
use crate::hooks;
use crate::interrupt::{Interrupt, Signal};
use crate::menu::Menu;
use anyhow::anyhow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

/// How a command execution relates to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The console is marked as executing; at most one such execution at a time.
    Foreground,
    /// Runs without touching the executing state, e.g. from inside another command.
    Background,
}

impl Console {
    /// Runs the command named by `args` in the command tree of `menu`.
    ///
    /// The command runs in its own thread with a child of `ctx`. This call returns as
    /// soon as that context is done: the command completed or failed, a signal was
    /// caught, or `ctx` itself was cancelled. A command that ignores cancellation keeps
    /// running in the background.
    ///
    /// Commands hidden by the current filters are not run, and no hook is called.
    pub fn execute(
        &self,
        ctx: &Context,
        menu: &Menu,
        args: Vec<String>,
        dispatch: Dispatch,
    ) -> Result<(), ExecError> {
        let _executing = match dispatch {
            Dispatch::Foreground => Some(self.begin_executing().ok_or(ExecError::Busy)?),
            Dispatch::Background => None,
        };

        // Trees are swapped when the menu is reset, keep ours for the whole execution.
        let tree = menu.tree();
        if let Some((target, _)) = tree.find(&args) {
            if self.is_hidden(&target) {
                log::debug!("command {:?} is filtered", target.path.join(" "));
                return Ok(());
            }
        }

        let hooks = self.hooks();
        hooks::run_all(&hooks.pre_run).map_err(ExecError::PreRun)?;

        let task = ctx.with_cancel();
        let failure: Arc<Mutex<Option<anyhow::Error>>> = Arc::new(Mutex::new(None));

        let subscription = {
            let task = task.clone();
            self.signals()
                .subscribe(Box::new(move |signal: Signal| {
                    if task.cancel(Cause::Signal(signal)) {
                        log::debug!("command cancelled by signal: {signal}");
                    }
                }))
                .map_err(ExecError::Signals)?
        };

        let spawned = {
            let console = self.clone();
            let task = task.clone();
            let failure = failure.clone();
            let post_run = hooks.post_run;
            thread::Builder::new()
                .name(format!("command {}", args.first().map_or("", String::as_str)))
                .spawn(move || {
                    let run = || -> anyhow::Result<()> {
                        tree.execute(&console, &task, &args)?;
                        // Post-run hooks are skipped once the command is cancelled.
                        if !task.is_done() {
                            hooks::run_all(&post_run)?;
                        }
                        Ok(())
                    };
                    let result = panic::catch_unwind(AssertUnwindSafe(run))
                        .unwrap_or_else(|_| Err(anyhow!("command panicked")));
                    match result {
                        Ok(()) => {
                            task.cancel(Cause::Completed);
                        }
                        Err(err) => {
                            *console::lock(&*failure) = Some(err);
                            task.cancel(Cause::Failed);
                        }
                    }
                })
        };
        if let Err(err) = spawned {
            task.cancel(Cause::Canceled);
            return Err(ExecError::Spawn(err));
        }

        let cause = task.wait();
        drop(subscription);
        log::debug!("command done: {cause}");

        match cause {
            Cause::Completed => Ok(()),
            Cause::Failed => Err(ExecError::Command(
                console::lock(&*failure)
                    .take()
                    .unwrap_or_else(|| anyhow!("command failed")),
            )),
            Cause::Signal(signal) => {
                menu.handle_interrupt(self, Interrupt::Signal(signal));
                Err(ExecError::Interrupted(signal))
            }
            cause => Err(ExecError::Canceled(cause)),
        }
    }
}
