use anyhow::Context;
use argh::FromArgs;
use menu_console::{Config, Console};
use std::path::PathBuf;

mod builtin;

#[derive(FromArgs)]
/// A demo console with a main menu and a "client" menu.
struct Args {
    #[argh(option, short = 'c')]
    /// path to a TOML config file
    config: Option<PathBuf>,

    #[argh(option)]
    /// file persisting the history of the main menu
    history: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args: Args = argh::from_env();
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("can't load config {}", path.display()))?,
        None => Config {
            app_name: "demo".to_string(),
            ..Config::default()
        },
    };

    let console = Console::new(config)?;
    builtin::install(&console, args.history)?;
    console.start()?;
    Ok(())
}
