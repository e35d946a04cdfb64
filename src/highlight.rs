//! Syntax highlighting of the input line.

use crate::config::HighlightConfig;
use crate::console::Console;
use crate::lexer::{self, Word};

/// Resets the foreground color.
const RESET: &str = "\x1b[39m";

/// Colors `line` for display: the command path, flags and quoted sections.
///
/// Hidden commands are not colored as commands.
///
/// Only escape sequences are added, the visible text is unchanged.
pub fn highlight(console: &Console, line: &str) -> String {
    let (words, end) = match lexer::tokenize(line) {
        Ok(words) => (words, line.len()),
        Err(err) => (err.words, err.offset),
    };
    let values: Vec<String> = words.iter().map(|word| word.value.clone()).collect();
    let command_words = console
        .current_menu()
        .tree()
        .find(&values)
        .filter(|(target, _)| !console.is_hidden(target))
        .map_or(0, |(target, _)| target.path.len());
    paint(line, &words, end, command_words, &console.config().highlight)
}

fn paint(
    line: &str,
    words: &[Word],
    end: usize,
    command_words: usize,
    colors: &HighlightConfig,
) -> String {
    let mut out = String::with_capacity(line.len() * 2);
    let mut cursor = 0;

    for (i, word) in words.iter().enumerate() {
        out.push_str(&line[cursor..word.span.start]);
        let text = &line[word.span.clone()];
        if i < command_words {
            colored(&mut out, &colors.command, text);
        } else if word.quoted.is_empty() && text.starts_with('-') {
            colored(&mut out, &colors.flag, text);
        } else {
            let mut inner = word.span.start;
            for quoted in &word.quoted {
                out.push_str(&line[inner..quoted.span.start]);
                colored(&mut out, &colors.quote, &line[quoted.span.clone()]);
                inner = quoted.span.end;
            }
            out.push_str(&line[inner..word.span.end]);
        }
        cursor = word.span.end;
    }

    out.push_str(&line[cursor..end]);
    if end < line.len() {
        colored(&mut out, &colors.quote, &line[end..]);
    }
    out
}

fn colored(out: &mut String, color: &str, text: &str) {
    out.push_str(color);
    out.push_str(text);
    out.push_str(RESET);
}
