//! Commands and menus of the demo console.

use anyhow::{Result, bail};
use argh::FromArgs;
use menu_console::{Command, CommandSet, Console, Context, Interrupt, Signal};
use regex::RegexBuilder;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const CLIENT_MENU: &str = "client";

/// Sets up the main and client menus.
pub fn install(console: &Console, history: Option<PathBuf>) -> Result<()> {
    console.set_logo(|console| {
        console.print(format!(
            "{} - type a command, Ctrl-D to quit",
            console.config().app_name
        ))
    });

    let main = console.current_menu();
    if let Some(path) = history {
        main.add_history_file("history", path)?;
    }
    main.set_commands(|| {
        CommandSet::new()
            .command::<Echo>()
            .command::<Sleep>()
            .command::<Use>()
            .command::<Hide>()
            .command::<Show>()
            .command::<History>()
            .command::<Notify>()
            .command::<Exit>()
    });
    main.add_interrupt(Interrupt::CtrlC, |console| {
        console.print("(use exit or Ctrl-D to quit)")
    });
    main.add_interrupt(Signal::Interrupt, |console| console.print("command interrupted"));

    let client = console.new_menu(CLIENT_MENU);
    client.set_commands(|| {
        CommandSet::new()
            .command::<Echo>()
            .command::<Sleep>()
            .command::<History>()
            .group("session", &["sessions"], |g| {
                g.function("open", &[], |console, _, args| {
                    console.print(format!("session opened: {}", args.join(" ")));
                    Ok(())
                })
                .function("list", &[], |console, _, _| {
                    console.print("no sessions");
                    Ok(())
                })
            })
            .function("back", &[], |console, _, _| {
                console.switch_menu("");
                Ok(())
            })
            .command::<Exit>()
    });
    // Ctrl-D leaves the client menu instead of the console.
    client.add_interrupt(Interrupt::Eof, |console| console.switch_menu(""));
    client.add_interrupt(Signal::Interrupt, |console| console.print("command interrupted"));
    Ok(())
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
pub struct Echo {
    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl Command for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        console.print(self.args.join(" "));
        Ok(())
    }
}

#[derive(FromArgs)]
/// wait for the given number of seconds. Ctrl-C cancels the wait.
pub struct Sleep {
    #[argh(positional)]
    /// seconds to wait, fractions allowed.
    pub seconds: f64,
}

impl Command for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn execute(self, _console: &Console, ctx: &Context) -> Result<()> {
        let Ok(duration) = Duration::try_from_secs_f64(self.seconds) else {
            bail!("sleep: invalid duration {}", self.seconds);
        };
        if let Some(cause) = ctx.wait_timeout(duration) {
            log::debug!("sleep stopped early: {cause}");
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// switch to another menu.
pub struct Use {
    #[argh(positional)]
    /// name of the menu, "client" or "" for the main menu.
    pub menu: String,
}

impl Command for Use {
    fn name() -> &'static str {
        "use"
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        if console.menu(&self.menu).is_none() {
            bail!("use: no menu named {:?}", self.menu);
        }
        console.switch_menu(&self.menu);
        Ok(())
    }
}

#[derive(FromArgs)]
/// hide the commands carrying any of the given tags.
pub struct Hide {
    #[argh(positional, greedy)]
    /// tags to hide.
    pub tags: Vec<String>,
}

impl Command for Hide {
    fn name() -> &'static str {
        "hide"
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        console.hide_commands(&tags);
        console.print(format!("hidden: {}", console.filters().join(", ")));
        Ok(())
    }
}

#[derive(FromArgs)]
/// show again the commands carrying the given tags, or all commands.
pub struct Show {
    #[argh(positional, greedy)]
    /// tags to show. All hidden commands are shown if none is given.
    pub tags: Vec<String>,
}

impl Command for Show {
    fn name() -> &'static str {
        "show"
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        console.show_commands(&tags);
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the history of the current menu.
pub struct History {
    #[argh(option, short = 'g')]
    /// only print the entries matching this regular expression.
    pub grep: Option<String>,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions
    pub ignore_case: bool,
}

impl Command for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        let re = match &self.grep {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(self.ignore_case)
                    .build()?,
            ),
            None => None,
        };
        for (name, source) in console.current_menu().histories() {
            console.print(format!("# {name}"));
            for (i, entry) in source.entries().iter().enumerate() {
                if re.as_ref().is_none_or(|re| re.is_match(entry)) {
                    console.print(format!("{:>5}  {entry}", i + 1));
                }
            }
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print a message from the background after a delay.
pub struct Notify {
    #[argh(option, short = 'd', default = "2")]
    /// delay in seconds.
    pub delay: u64,

    #[argh(positional, greedy)]
    /// the message.
    pub message: Vec<String>,
}

impl Command for Notify {
    fn name() -> &'static str {
        "notify"
    }

    fn tags() -> &'static [&'static str] {
        &["async"]
    }

    fn execute(self, console: &Console, _ctx: &Context) -> Result<()> {
        let console = console.downgrade();
        let message = self.message.join(" ");
        thread::Builder::new()
            .name("notify".to_string())
            .spawn(move || {
                thread::sleep(Duration::from_secs(self.delay));
                if let Some(console) = console.upgrade() {
                    console.print(format!("[notify] {message}"));
                }
            })?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// leave the console.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl Command for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _console: &Console, _ctx: &Context) -> Result<()> {
        std::process::exit(0)
    }
}
