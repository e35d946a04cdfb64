//! Command trees executed by the console.
//!
//! The console only relies on the [`CommandTree`] contract: resolving words to a
//! [`Target`] and executing a full argument list. [`CommandSet`] is the tree
//! implementation shipped with the crate, built from [`Command`] types parsed with
//! [`argh`], plain closures and nested groups.

use crate::console::Console;
use crate::context::Context;
use anyhow::{Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::marker::PhantomData;

/// The command resolved from the leading words of a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Names from the root of the tree down to the command.
    pub path: Vec<String>,
    /// Tags of the command, including those inherited from its groups.
    pub tags: Vec<String>,
}

impl Target {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A tree of commands owned by a menu.
///
/// Trees are regenerated from the menu's provider before every read, so
/// implementations are free to keep per-invocation state.
pub trait CommandTree: Send + Sync {
    /// Resolves the command named by the leading `words`.
    ///
    /// Returns the target and the words left as its arguments, or `None` if the first
    /// word names no command.
    fn find<'a>(&self, words: &'a [String]) -> Option<(Target, &'a [String])>;

    /// Runs the command named by `args`.
    fn execute(&self, console: &Console, ctx: &Context, args: &[String]) -> Result<()>;

    /// The commands directly below the group at `path`, the top level if `path` is
    /// empty. Used for completion.
    fn subcommands(&self, _path: &[String]) -> Vec<Target> {
        Vec::new()
    }
}

/// A command parsed from its arguments with [`argh`].
///
/// ```no_run
/// use argh::FromArgs;
/// use menu_console::command::Command;
/// use menu_console::{Console, Context};
///
/// #[derive(FromArgs)]
/// /// Print the arguments.
/// struct Echo {
///     #[argh(positional, greedy)]
///     /// words to print
///     words: Vec<String>,
/// }
///
/// impl Command for Echo {
///     fn name() -> &'static str {
///         "echo"
///     }
///
///     fn execute(self, console: &Console, _ctx: &Context) -> anyhow::Result<()> {
///         console.print(self.words.join(" "));
///         Ok(())
///     }
/// }
/// ```
pub trait Command: Sized + FromArgs + Send + 'static {
    /// Canonical name of the command, e.g. "echo".
    fn name() -> &'static str;

    /// Tags used to hide the command with [`Console::hide_commands`].
    fn tags() -> &'static [&'static str] {
        &[]
    }

    /// Runs the command. Long-running commands should watch `ctx` and return once it
    /// is done.
    fn execute(self, console: &Console, ctx: &Context) -> Result<()>;
}

trait Leaf: Send + Sync {
    fn run(&self, console: &Console, ctx: &Context, path: &[&str], args: &[&str]) -> Result<()>;
}

/// Creates [`Command`] instances from their arguments.
struct Factory<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: Command> Leaf for Factory<T> {
    fn run(&self, console: &Console, ctx: &Context, path: &[&str], args: &[&str]) -> Result<()> {
        match T::from_args(path, args) {
            Ok(cmd) => cmd.execute(console, ctx),
            // `--help` lands here with a successful status.
            Err(EarlyExit { output, status }) => match status {
                Ok(()) => {
                    console.print(output);
                    Ok(())
                }
                Err(()) => Err(anyhow!(output.trim_end().to_string())),
            },
        }
    }
}

struct FnLeaf<F>(F);

impl<F> Leaf for FnLeaf<F>
where
    F: Fn(&Console, &Context, &[String]) -> Result<()> + Send + Sync,
{
    fn run(&self, console: &Console, ctx: &Context, _path: &[&str], args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        (self.0)(console, ctx, &args)
    }
}

enum Node {
    Leaf(Box<dyn Leaf>),
    Group(CommandSet),
}

struct Entry {
    name: String,
    tags: Vec<String>,
    node: Node,
}

/// A command tree built from typed commands, closures and groups.
///
/// Tags of a group apply to every command inside it.
#[derive(Default)]
pub struct CommandSet {
    entries: Vec<Entry>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a typed command.
    pub fn command<T: Command>(self) -> Self {
        let tags = T::tags().iter().map(|tag| tag.to_string()).collect();
        self.entry(T::name(), tags, Node::Leaf(Box::new(Factory::<T>::default())))
    }

    /// Adds a command implemented by a closure receiving the command arguments.
    pub fn function<F>(self, name: &str, tags: &[&str], f: F) -> Self
    where
        F: Fn(&Console, &Context, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        let tags = tags.iter().map(|tag| tag.to_string()).collect();
        self.entry(name, tags, Node::Leaf(Box::new(FnLeaf(f))))
    }

    /// Adds a group of subcommands.
    pub fn group(self, name: &str, tags: &[&str], build: impl FnOnce(CommandSet) -> CommandSet) -> Self {
        let tags = tags.iter().map(|tag| tag.to_string()).collect();
        self.entry(name, tags, Node::Group(build(CommandSet::new())))
    }

    /// Names of the top-level commands, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    fn entry(mut self, name: &str, tags: Vec<String>, node: Node) -> Self {
        let entry = Entry {
            name: name.to_string(),
            tags,
            node,
        };
        // A later registration replaces an earlier one with the same name.
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// Walks down the tree as far as the words name entries.
    fn resolve<'s, 'a>(&'s self, words: &'a [String]) -> Option<(Target, &'s Entry, &'a [String])> {
        let (first, mut rest) = words.split_first()?;
        let mut entry = self.entries.iter().find(|e| &e.name == first)?;
        let mut target = Target {
            path: vec![entry.name.clone()],
            tags: entry.tags.clone(),
        };

        while let Node::Group(set) = &entry.node {
            let Some((word, tail)) = rest.split_first() else {
                break;
            };
            let Some(child) = set.entries.iter().find(|e| &e.name == word) else {
                break;
            };
            target.path.push(child.name.clone());
            inherit(&mut target.tags, &child.tags);
            entry = child;
            rest = tail;
        }
        Some((target, entry, rest))
    }
}

/// Adds the tags of a nested entry, skipping those already present.
fn inherit(tags: &mut Vec<String>, more: &[String]) {
    for tag in more {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
}

impl CommandTree for CommandSet {
    fn subcommands(&self, path: &[String]) -> Vec<Target> {
        let mut set = self;
        let mut tags: Vec<String> = Vec::new();
        for word in path {
            let Some(entry) = set.entries.iter().find(|e| &e.name == word) else {
                return Vec::new();
            };
            let Node::Group(group) = &entry.node else {
                return Vec::new();
            };
            inherit(&mut tags, &entry.tags);
            set = group;
        }
        set.entries
            .iter()
            .map(|entry| {
                let mut target = Target {
                    path: path.to_vec(),
                    tags: tags.clone(),
                };
                target.path.push(entry.name.clone());
                inherit(&mut target.tags, &entry.tags);
                target
            })
            .collect()
    }

    fn find<'a>(&self, words: &'a [String]) -> Option<(Target, &'a [String])> {
        self.resolve(words).map(|(target, _, rest)| (target, rest))
    }

    fn execute(&self, console: &Console, ctx: &Context, args: &[String]) -> Result<()> {
        let Some((target, entry, rest)) = self.resolve(args) else {
            match args.first() {
                Some(name) => bail!("unknown command: {name}"),
                None => return Ok(()),
            }
        };
        let path = target.path.join(" ");
        match &entry.node {
            Node::Leaf(leaf) => {
                let path: Vec<&str> = target.path.iter().map(String::as_str).collect();
                let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
                leaf.run(console, ctx, &path, &rest)
            }
            Node::Group(set) => match rest.first() {
                Some(word) => bail!("{path}: unknown subcommand: {word}"),
                None => bail!("{path}: expected a subcommand ({})", set.names().join(", ")),
            },
        }
    }
}
