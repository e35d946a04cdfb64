//! The read loop.

use crate::console::{self, Console};
use crate::context::Context;
use crate::error::ConsoleError;
use crate::execute::Dispatch;
use crate::hooks;
use crate::interrupt::Interrupt;
use crate::lexer;
use crate::menu::Menu;
use crate::prompt::PromptSlot;
use crate::reader::ReadError;

impl Console {
    /// Runs the read loop until the input ends.
    ///
    /// Returns `Ok(())` when end of input is reached and the active menu has no handler
    /// for it, or an error if the line reader fails for good. Every other error is
    /// passed to the error handler and the loop goes on.
    pub fn start(&self) -> Result<(), ConsoleError> {
        self.start_with(&Context::background())
    }

    /// Like [`Console::start`], also returning once `ctx` is done.
    ///
    /// Commands run with children of `ctx`, so cancelling it cancels the running
    /// command too.
    pub fn start_with(&self, ctx: &Context) -> Result<(), ConsoleError> {
        self.bind_histories(&self.current_menu());
        self.print_logo();

        let mut last_line = String::new();
        while !ctx.is_done() {
            self.display_post_run(&last_line);

            // Fresh commands for every line.
            let menu = self.current_menu();
            menu.reset_commands();
            self.bind_histories(&menu);
            log::trace!("reading in menu {:?}", menu.name());

            if let Err(err) = hooks::run_all(&self.hooks().pre_read) {
                self.report(&ConsoleError::PreRead(err));
                continue;
            }

            let line = match self.read_input(&menu) {
                Ok(line) => line,
                Err(ReadError::Interrupted(interrupt)) => {
                    last_line.clear();
                    let handled = self.current_menu().handle_interrupt(self, interrupt);
                    if !handled && interrupt == Interrupt::Eof {
                        log::debug!("end of input");
                        return Ok(());
                    }
                    continue;
                }
                Err(ReadError::Fatal(err)) => return Err(ConsoleError::Reader(err)),
            };
            self.record_history(&line);

            // Whatever ran while reading may have switched menus.
            let menu = self.current_menu();
            self.display_pre_run(&line);
            if let Err(err) = self.run_line(ctx, &menu, &line) {
                if !err.is_interrupt() {
                    self.report(&err);
                }
            }
            last_line = line;
        }
        Ok(())
    }

    /// Reads one line, and continuation lines while quotes or escapes are left open.
    fn read_input(&self, menu: &Menu) -> Result<String, ReadError> {
        let prompt = menu.prompt();
        let mut slot = console::lock(&self.shared.reader);
        let mut line = slot.reader.read_line(&prompt.render(PromptSlot::Primary))?;
        while lexer::tokenize(&line).is_err() {
            let next = slot
                .reader
                .read_line(&prompt.render(PromptSlot::Secondary))?;
            line.push('\n');
            line.push_str(&next);
        }
        Ok(line)
    }

    fn run_line(&self, ctx: &Context, menu: &Menu, line: &str) -> Result<(), ConsoleError> {
        let args = lexer::split(line)?;
        if args.is_empty() {
            return Ok(());
        }
        let args =
            hooks::run_line_hooks(&self.hooks().line, args).map_err(ConsoleError::LineHook)?;
        Ok(self.execute(ctx, menu, args, Dispatch::Foreground)?)
    }

    fn display_pre_run(&self, line: &str) {
        let config = self.config();
        if config.newline_before
            && (config.newline_when_empty || !lexer::is_empty(line, &config.empty_chars))
        {
            println!();
        }
    }

    fn display_post_run(&self, last_line: &str) {
        let config = self.config();
        if config.newline_after
            && (config.newline_when_empty || !lexer::is_empty(last_line, &config.empty_chars))
        {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSet;
    use crate::config::Config;
    use crate::history::{HistorySource, MemoryHistory};
    use crate::interrupt::Signal;
    use crate::testing::{ManualSignals, ScriptedReader, Step};
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn recording_console(script: Vec<Step>) -> (Console, ScriptedReader, Arc<Mutex<Vec<String>>>) {
        let reader = ScriptedReader::new(script);
        let console = Console::with_reader(Config::default(), Box::new(reader.clone()));
        console.set_signal_source(ManualSignals::new());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        console.set_error_handler(move |err| sink.lock().unwrap().push(err.to_string()));
        (console, reader, errors)
    }

    fn recorder(calls: &Arc<Mutex<Vec<String>>>) -> CommandSet {
        let calls = calls.clone();
        CommandSet::new().function("say", &[], move |_, _, args| {
            calls.lock().unwrap().push(args.join(" "));
            Ok(())
        })
    }

    #[test]
    fn test_eof_without_handler_ends_loop() -> anyhow::Result<()> {
        let (console, reader, errors) = recording_console(vec![Step::Interrupt(Interrupt::Eof)]);
        console.start()?;
        assert_eq!(reader.prompts(), ["console > "]);
        assert!(errors.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_eof_handler_runs_once_and_loop_continues() -> anyhow::Result<()> {
        let (console, reader, _) = recording_console(vec![
            Step::Interrupt(Interrupt::Eof),
            Step::Line("say after".into()),
        ]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let menu = console.current_menu();
        let commands = calls.clone();
        menu.set_commands(move || recorder(&commands));
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = handled.clone();
        menu.add_interrupt(Interrupt::Eof, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // The script is exhausted after the second line, which fails the reader.
        let err = console.start().unwrap_err();
        assert!(matches!(err, ConsoleError::Reader(_)));
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(*calls.lock().unwrap(), ["after"]);
        assert_eq!(reader.prompts().len(), 3);
        Ok(())
    }

    #[test]
    fn test_unhandled_ctrl_c_resumes_reading() -> anyhow::Result<()> {
        let (console, reader, errors) = recording_console(vec![
            Step::Interrupt(Interrupt::CtrlC),
            Step::Interrupt(Interrupt::Eof),
        ]);
        console.start()?;
        assert_eq!(reader.prompts().len(), 2);
        assert!(errors.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_errors_are_reported_and_loop_continues() -> anyhow::Result<()> {
        let (console, _, errors) = recording_console(vec![
            Step::Line("nope".into()),
            Step::Line("fail".into()),
            Step::Line("say ok".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let commands = calls.clone();
        console.current_menu().set_commands(move || {
            recorder(&commands).function("fail", &[], |_, _, _| bail!("boom"))
        });

        console.start()?;
        assert_eq!(*errors.lock().unwrap(), ["unknown command: nope", "boom"]);
        assert_eq!(*calls.lock().unwrap(), ["ok"]);
        Ok(())
    }

    #[test]
    fn test_incomplete_lines_are_continued() -> anyhow::Result<()> {
        let (console, reader, _) = recording_console(vec![
            Step::Line("say 'first".into()),
            Step::Line("second'".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let commands = calls.clone();
        console.current_menu().set_commands(move || recorder(&commands));

        console.start()?;
        assert_eq!(*calls.lock().unwrap(), ["first\nsecond"]);
        assert_eq!(reader.prompts(), ["console > ", "> ", "console > "]);
        let history = console.current_menu().histories()[0].1.entries();
        assert_eq!(history, ["say 'first\nsecond'"]);
        Ok(())
    }

    #[test]
    fn test_line_hooks_rewrite_and_abort() -> anyhow::Result<()> {
        let (console, _, errors) = recording_console(vec![
            Step::Line("greet".into()),
            Step::Line("forbidden".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let commands = calls.clone();
        console.current_menu().set_commands(move || recorder(&commands));
        console.add_line_hook(|words| match words[0].as_str() {
            "greet" => Ok(vec!["say".to_string(), "hello".to_string()]),
            "forbidden" => bail!("not allowed"),
            _ => Ok(words),
        });

        console.start()?;
        assert_eq!(*calls.lock().unwrap(), ["hello"]);
        assert_eq!(*errors.lock().unwrap(), ["line hook: not allowed"]);
        Ok(())
    }

    #[test]
    fn test_pre_read_hooks_run_before_every_read() -> anyhow::Result<()> {
        let (console, _, _) = recording_console(vec![
            Step::Line("".into()),
            Step::Line("  ".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        console.add_pre_read_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        console.start()?;
        assert_eq!(reads.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[test]
    fn test_failing_pre_read_hook_skips_one_read() -> anyhow::Result<()> {
        let (console, reader, errors) = recording_console(vec![
            Step::Line("run".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        console.add_pre_read_hook(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                bail!("not ready");
            }
            Ok(())
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let runs = ran.clone();
        console.current_menu().set_commands(move || {
            let runs = runs.clone();
            CommandSet::new().function("run", &[], move |_, _, _| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        console.start()?;
        assert_eq!(*errors.lock().unwrap(), ["pre-read hook: not ready"]);
        // Nothing was read on the failed iteration.
        assert_eq!(reader.prompts().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_menu_switch_while_running_rebinds_histories() -> anyhow::Result<()> {
        let (console, reader, _) = recording_console(vec![
            Step::Line("use client".into()),
            Step::Line("status".into()),
            Step::Interrupt(Interrupt::Eof),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let client = console.new_menu("client");
        let client_history = Arc::new(MemoryHistory::new());
        client.add_history_source("client", SharedHistory(client_history.clone()));
        client.set_commands(|| CommandSet::new().function("status", &[], |_, _, _| Ok(())));
        client.add_interrupt(Interrupt::Eof, |console| console.switch_menu(""));
        console.current_menu().set_commands(|| {
            CommandSet::new().function("use", &[], |console, _, args| {
                console.switch_menu(&args[0]);
                Ok(())
            })
        });

        console.start()?;
        assert_eq!(
            reader.prompts(),
            ["console > ", "console [client] > ", "console [client] > ", "console > "]
        );
        // Lines are recorded in the histories bound while they were read.
        assert_eq!(client_history.entries(), ["status"]);
        assert_eq!(
            console.current_menu().histories()[0].1.entries(),
            ["use client"]
        );
        Ok(())
    }

    #[test]
    fn test_signal_during_loop_is_not_reported() -> anyhow::Result<()> {
        let reader = ScriptedReader::new(vec![
            Step::Line("hang".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let console = Console::with_reader(Config::default(), Box::new(reader));
        let signals = ManualSignals::new();
        console.set_signal_source(signals.clone());
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        console.set_error_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let interrupted = Arc::new(AtomicUsize::new(0));
        let counter = interrupted.clone();
        let menu = console.current_menu();
        menu.add_interrupt(Signal::Terminate, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        menu.set_commands(move || {
            let signals = signals.clone();
            CommandSet::new().function("hang", &[], move |_, ctx, _| {
                signals.raise(Signal::Terminate);
                ctx.wait();
                Ok(())
            })
        });

        console.start()?;
        assert_eq!(interrupted.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_done_context_stops_loop() -> anyhow::Result<()> {
        let (console, reader, _) = recording_console(vec![Step::Line("stop".into())]);
        let ctx = Context::background();
        let root = ctx.clone();
        console.current_menu().set_commands(move || {
            let root = root.clone();
            CommandSet::new().function("stop", &[], move |_, _, _| {
                root.cancel(crate::context::Cause::Canceled);
                Ok(())
            })
        });

        console.start_with(&ctx)?;
        assert_eq!(reader.prompts().len(), 1);
        Ok(())
    }

    #[test]
    fn test_logo_is_printed_once() -> anyhow::Result<()> {
        let (console, _, _) = recording_console(vec![
            Step::Line("".into()),
            Step::Interrupt(Interrupt::Eof),
        ]);
        let printed = Arc::new(AtomicUsize::new(0));
        let counter = printed.clone();
        console.set_logo(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        console.start()?;
        assert_eq!(printed.load(Ordering::SeqCst), 1);
        Ok(())
    }

    /// Shares one memory history between the test and the menu.
    struct SharedHistory(Arc<MemoryHistory>);

    impl HistorySource for SharedHistory {
        fn append(&self, entry: &str) -> anyhow::Result<()> {
            self.0.append(entry)
        }

        fn entries(&self) -> Vec<String> {
            self.0.entries()
        }
    }
}
