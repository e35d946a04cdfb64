//! A module implementing word splitting (tokenization) of console input lines.
//!
//! Lines are split the way a POSIX shell splits words: whitespace separates words,
//! single quotes preserve everything literally, double quotes preserve everything but
//! a small set of backslash escapes, and a backslash outside quotes escapes the next
//! character. Unterminated constructs are reported as a [`TokenizeError`] carrying
//! the unconsumed remainder of the line, so callers can read more input and retry.

use std::ops::Range;
use thiserror::Error;

/// Characters separating words outside of quotes.
const SPLIT_CHARS: [char; 3] = [' ', '\t', '\n'];

/// Characters that a backslash escapes inside a double-quoted string.
const DOUBLE_ESCAPE_CHARS: [char; 5] = ['$', '`', '"', '\n', '\\'];

/// The quoting style of a quoted section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `'...'`, everything is literal.
    Single,
    /// `"..."`, only `$`, `` ` ``, `"`, `\` and newline can be escaped.
    Double,
}

/// A quoted section of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quoted {
    /// Which quotes delimit the section.
    pub quote: Quote,
    /// Byte range of the section in the input line, quotes included.
    pub span: Range<usize>,
}

/// A word produced by the tokenizer.
///
/// Besides its final value, a word remembers where it came from in the input line and
/// which parts of it were quoted. The syntax highlighter relies on this to re-emit the
/// original text with colors, without parsing the line a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// The word with quotes removed and escapes processed.
    pub value: String,
    /// Byte range of the word in the input line.
    pub span: Range<usize>,
    /// Quoted sections of the word, in input order.
    pub quoted: Vec<Quoted>,
}

/// The construct left open at the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeErrorKind {
    /// A single quote was opened but never closed.
    #[error("unterminated single-quoted string")]
    UnterminatedSingleQuote,
    /// A double quote was opened but never closed.
    #[error("unterminated double-quoted string")]
    UnterminatedDoubleQuote,
    /// The input ends with a backslash.
    #[error("unterminated backslash-escape")]
    UnterminatedEscape,
}

/// Error returned when a line ends inside a quote or an escape.
///
/// Every such error means the line is incomplete: appending more input (joined with a
/// newline) may turn it into a valid line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct TokenizeError {
    /// What was left open.
    pub kind: TokenizeErrorKind,
    /// The words completed before the unterminated one.
    pub words: Vec<Word>,
    /// Byte offset where the unconsumed remainder starts.
    pub offset: usize,
    /// The unconsumed input, starting with the unterminated word.
    pub remainder: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    Raw,
    SingleQuote,
    DoubleQuote,
    Escape,
}

struct LexingFSM<'a> {
    line: &'a str,
    input: Vec<(usize, char)>,
    pos: usize,
    state: LexingState,
    words: Vec<Word>,
    buffer: String,
    word_start: Option<usize>,
    quote_start: usize,
    quoted: Vec<Quoted>,
    // A backslash seen between words starts a word, unless it escapes a newline.
    escape_opened_word: bool,
}

impl<'a> LexingFSM<'a> {
    /// Creates a state machine positioned at the start of `line`.
    ///
    /// # Arguments
    /// * `line` - The input line, possibly spanning several physical lines.
    fn new(line: &'a str) -> Self {
        LexingFSM {
            line,
            input: line.char_indices().collect(),
            pos: 0,
            state: LexingState::Start,
            words: Vec::new(),
            buffer: String::new(),
            word_start: None,
            quote_start: 0,
            quoted: Vec::new(),
            escape_opened_word: false,
        }
    }

    /// Runs the state machine over the whole line.
    ///
    /// # Returns
    /// The words of the line, or a `TokenizeError` holding the completed words and the
    /// unterminated remainder if the line ends inside a quote or after a backslash.
    fn make_words(mut self) -> Result<Vec<Word>, TokenizeError> {
        while let Some((offset, ch)) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(offset, ch),
                LexingState::Raw => self.handle_raw(offset, ch),
                LexingState::SingleQuote => self.handle_single_quote(offset, ch),
                LexingState::DoubleQuote => self.handle_double_quote(offset, ch),
                LexingState::Escape => self.handle_escape(ch),
            }
        }

        let kind = match self.state {
            LexingState::SingleQuote => TokenizeErrorKind::UnterminatedSingleQuote,
            LexingState::DoubleQuote => TokenizeErrorKind::UnterminatedDoubleQuote,
            LexingState::Escape => TokenizeErrorKind::UnterminatedEscape,
            LexingState::Start | LexingState::Raw => {
                let end = self.line.len();
                self.finish_word(end);
                return Ok(self.words);
            }
        };

        let offset = self.word_start.unwrap_or(self.line.len());
        Err(TokenizeError {
            kind,
            words: self.words,
            offset,
            remainder: self.line[offset..].to_string(),
        })
    }

    /// Consumes the next character along with its byte offset in the line.
    fn read_char(&mut self) -> Option<(usize, char)> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).map(|(_, ch)| *ch)
    }

    /// Handles a character read between words.
    ///
    /// # Arguments
    /// * `offset` - Byte offset of `ch`, recorded as the start of a new word.
    /// * `ch` - The character read.
    fn handle_start(&mut self, offset: usize, ch: char) {
        if SPLIT_CHARS.contains(&ch) {
            return;
        }
        self.word_start = Some(offset);
        match ch {
            '\'' => self.open_quote(offset, LexingState::SingleQuote),
            '"' => self.open_quote(offset, LexingState::DoubleQuote),
            '\\' => {
                self.escape_opened_word = true;
                self.state = LexingState::Escape;
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::Raw;
            }
        }
    }

    fn handle_raw(&mut self, offset: usize, ch: char) {
        match ch {
            c if SPLIT_CHARS.contains(&c) => {
                self.finish_word(offset);
                self.state = LexingState::Start;
            }
            '\'' => self.open_quote(offset, LexingState::SingleQuote),
            '"' => self.open_quote(offset, LexingState::DoubleQuote),
            '\\' => {
                self.escape_opened_word = false;
                self.state = LexingState::Escape;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, offset: usize, ch: char) {
        match ch {
            '\'' => self.close_quote(offset, Quote::Single),
            c => self.buffer.push(c),
        }
    }

    /// Inside double quotes a backslash only escapes `$`, `` ` ``, `"`, `\\` and newline.
    fn handle_double_quote(&mut self, offset: usize, ch: char) {
        match ch {
            '"' => self.close_quote(offset, Quote::Double),
            '\\' => match self.peek_char() {
                Some(next) if DOUBLE_ESCAPE_CHARS.contains(&next) => {
                    self.read_char();
                    // An escaped newline is a line continuation.
                    if next != '\n' {
                        self.buffer.push(next);
                    }
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn handle_escape(&mut self, ch: char) {
        if ch != '\n' {
            self.buffer.push(ch);
            self.state = LexingState::Raw;
        } else if self.escape_opened_word {
            // Line continuation between words: nothing was started after all.
            self.word_start = None;
            self.state = LexingState::Start;
        } else {
            self.state = LexingState::Raw;
        }
    }

    fn open_quote(&mut self, offset: usize, state: LexingState) {
        self.quote_start = offset;
        self.state = state;
    }

    fn close_quote(&mut self, offset: usize, quote: Quote) {
        self.quoted.push(Quoted {
            quote,
            span: self.quote_start..offset + 1,
        });
        self.state = LexingState::Raw;
    }

    /// Pushes the word being read, if any.
    ///
    /// # Arguments
    /// * `end` - Byte offset right after the word.
    fn finish_word(&mut self, end: usize) {
        if let Some(start) = self.word_start.take() {
            self.words.push(Word {
                value: std::mem::take(&mut self.buffer),
                span: start..end,
                quoted: std::mem::take(&mut self.quoted),
            });
        }
    }
}

/// Splits a line into words, keeping their positions and quoting.
pub fn tokenize(line: &str) -> Result<Vec<Word>, TokenizeError> {
    LexingFSM::new(line).make_words()
}

/// Splits a line into shell words.
///
/// # Examples
///
/// ```
/// use menu_console::lexer::split;
/// let words = split(r#"foo "bar baz" qux"#).unwrap();
/// assert_eq!(words, ["foo", "bar baz", "qux"]);
/// ```
pub fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    tokenize(line).map(|words| words.into_iter().map(|word| word.value).collect())
}

/// Splits a line into raw segments, one per word, keeping whitespace and quotes.
///
/// Each segment holds the original text of a word followed by the whitespace after it
/// (the first segment also holds any leading whitespace), so joining the segments gives
/// back the input line. When the line is incomplete, the unconsumed remainder is the
/// last segment.
pub fn split_preserving(line: &str) -> Vec<String> {
    let (words, end) = match tokenize(line) {
        Ok(words) => (words, line.len()),
        Err(err) => (err.words, err.offset),
    };

    let mut segments = Vec::with_capacity(words.len() + 1);
    let mut cursor = 0;
    for (i, _) in words.iter().enumerate() {
        let stop = words.get(i + 1).map_or(end, |next| next.span.start);
        segments.push(line[cursor..stop].to_string());
        cursor = stop;
    }
    if cursor < end {
        segments.push(line[cursor..end].to_string());
    }
    if end < line.len() {
        segments.push(line[end..].to_string());
    }
    segments
}

/// Returns whether the line only consists of the given characters.
pub fn is_empty(line: &str, empty_chars: &[char]) -> bool {
    line.chars().all(|c| empty_chars.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_words_round_trip() {
        let cases: &[&[&str]] = &[
            &["ls"],
            &["connect", "10.0.0.1", "--port=8080"],
            &["a", "b", "c", "d", "e"],
            &["über", "größe", "日本"],
        ];
        for case in cases {
            let line = case.join(" ");
            assert_eq!(split(&line).unwrap(), words(case), "line: {line}");
        }
    }

    #[test]
    fn test_whitespace_kinds_separate_words() {
        assert_eq!(split("  foo\tbar\n baz  ").unwrap(), words(&["foo", "bar", "baz"]));
        assert!(split(" \t ").unwrap().is_empty());
        assert!(split("").unwrap().is_empty());
    }

    #[test]
    fn test_double_quotes_keep_spaces() {
        assert_eq!(
            split(r#"foo "bar baz" qux"#).unwrap(),
            words(&["foo", "bar baz", "qux"])
        );
    }

    #[test]
    fn test_quotes_concatenate_with_raw_text() {
        assert_eq!(split(r#"a'b c'"d"e"#).unwrap(), words(&["ab cde"]));
        assert_eq!(split(r#"foo "" ''"#).unwrap(), words(&["foo", "", ""]));
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert_eq!(split(r#"'a\nb "c"'"#).unwrap(), words(&[r#"a\nb "c""#]));
    }

    #[test]
    fn test_double_quote_escapes() {
        assert_eq!(split(r#""a\"b\\c\$d\`e""#).unwrap(), words(&["a\"b\\c$d`e"]));
        // Other escapes are kept verbatim.
        assert_eq!(split(r#""a\nb""#).unwrap(), words(&[r"a\nb"]));
        assert_eq!(split("\"a\\\nb\"").unwrap(), words(&["ab"]));
    }

    #[test]
    fn test_backslash_outside_quotes() {
        assert_eq!(split(r"foo\ bar baz").unwrap(), words(&["foo bar", "baz"]));
        assert_eq!(split(r#"\"quoted\""#).unwrap(), words(&["\"quoted\""]));
        assert_eq!(split("foo\\\nbar").unwrap(), words(&["foobar"]));
        assert_eq!(split("foo \\\nbar").unwrap(), words(&["foo", "bar"]));
    }

    #[test]
    fn test_unterminated_single_quote() {
        let err = split("foo 'bar").unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnterminatedSingleQuote);
        assert_eq!(err.remainder, "'bar");
        assert_eq!(err.offset, 4);
        assert_eq!(err.words.len(), 1);
        assert_eq!(err.words[0].value, "foo");
    }

    #[test]
    fn test_unterminated_double_quote_and_escape() {
        let err = split(r#"say "hello"#).unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnterminatedDoubleQuote);
        assert_eq!(err.remainder, "\"hello");

        let err = split(r"run a\").unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnterminatedEscape);
        assert_eq!(err.remainder, r"a\");

        let err = split(r"run \").unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnterminatedEscape);
        assert_eq!(err.remainder, r"\");
    }

    #[test]
    fn test_incomplete_line_completes_with_more_input() {
        let first = "echo 'multi";
        assert!(split(first).is_err());
        let joined = format!("{first}\nline'");
        assert_eq!(split(&joined).unwrap(), words(&["echo", "multi\nline"]));
    }

    #[test]
    fn test_word_spans_and_quotes() {
        let line = r#"set  "a b" x'y'"#;
        let tokens = tokenize(line).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(&line[tokens[0].span.clone()], "set");
        assert_eq!(&line[tokens[1].span.clone()], "\"a b\"");
        assert_eq!(tokens[1].quoted[0].quote, Quote::Double);
        assert_eq!(&line[tokens[2].span.clone()], "x'y'");
        assert_eq!(&line[tokens[2].quoted[0].span.clone()], "'y'");
    }

    #[test]
    fn test_split_preserving_joins_back_to_input() {
        let lines = [
            "  foo \"bar baz\"  qux ",
            "one",
            "   ",
            "cmd 'open quote",
            r#"a "b" \"#,
            "",
        ];
        for line in lines {
            assert_eq!(split_preserving(line).concat(), line, "line: {line:?}");
        }
        assert_eq!(
            split_preserving(" foo 'bar"),
            words(&[" foo ", "'bar"])
        );
        assert_eq!(
            split_preserving("a  \"b c\" d"),
            words(&["a  ", "\"b c\" ", "d"])
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(" \t ", &[' ', '\t']));
        assert!(is_empty("", &[' ']));
        assert!(!is_empty(" x ", &[' ', '\t']));
    }
}
