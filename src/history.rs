//! History sources bound to the line reader.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A named source of history entries.
///
/// Menus own any number of history sources; the sources of the active menu are the
/// ones bound to the line reader. Entries must be returned in insertion order.
pub trait HistorySource: Send + Sync {
    /// Appends one accepted input line.
    fn append(&self, entry: &str) -> Result<()>;

    /// All entries, oldest first.
    fn entries(&self) -> Vec<String>;

    /// Number of entries.
    fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the source has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// History kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistorySource for MemoryHistory {
    fn append(&self, entry: &str) -> Result<()> {
        lock(&self.entries).push(entry.to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// History persisted in a text file, one entry per line.
///
/// Backslashes and newlines inside entries are escaped, so multi-line input survives
/// a round trip through the file.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    entries: Mutex<Vec<String>>,
}

impl FileHistory {
    /// Opens a history file, loading its entries. A missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => content.lines().map(unescape).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("can't read history file {}", path.display()));
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// The file backing this history.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistorySource for FileHistory {
    fn append(&self, entry: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("can't open history file {}", self.path.display()))?;
        writeln!(file, "{}", escape(entry))
            .with_context(|| format!("can't write history file {}", self.path.display()))?;
        entries.push(entry.to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

fn escape(entry: &str) -> String {
    let mut out = String::with_capacity(entry.len());
    for c in entry.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
