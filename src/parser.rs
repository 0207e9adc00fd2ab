//! Turns one raw input line into a [`Pipeline`].
//!
//! Only three characters are special: space separates words, `;` ends a
//! command, `|` ends a command and pipes its output into the next one.
//! There is no quoting or escaping; tabs and everything else belong to words.
//! The line is handled as bytes, so words need not be valid UTF-8.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::command::{Command, Pipeline};
use crate::error::ParseError;

/// Argument slots per command in the historical fixed-size implementation.
pub const LEGACY_MAX_ARGS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Extra arguments are dropped silently.
    #[default]
    Truncate,
    /// Extra arguments fail the whole line with `ArgumentOverflow`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// `None` means unbounded.
    pub max_args: Option<usize>,
    pub overflow: OverflowPolicy,
}

impl ParseOptions {
    pub fn legacy() -> Self {
        ParseOptions { max_args: Some(LEGACY_MAX_ARGS), overflow: OverflowPolicy::Truncate }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Space,
    Sequence,
    Pipe,
    End,
}

impl Delimiter {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b' ' => Some(Delimiter::Space),
            b';' => Some(Delimiter::Sequence),
            b'|' => Some(Delimiter::Pipe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a [u8]),
    Delim(Delimiter),
}

/// Yields words and delimiters left to right, always ending with `Delim(End)`.
pub struct Tokenizer<'a> {
    line: &'a [u8],
    i: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a [u8]) -> Self {
        Tokenizer { line, i: 0, done: false }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.done {
            return None;
        }
        let Some(&c) = self.line.get(self.i) else {
            self.done = true;
            return Some(Token::Delim(Delimiter::End));
        };
        if let Some(d) = Delimiter::from_byte(c) {
            self.i += 1;
            return Some(Token::Delim(d));
        }
        let start = self.i;
        while self.i < self.line.len() && Delimiter::from_byte(self.line[self.i]).is_none() {
            self.i += 1;
        }
        Some(Token::Word(&self.line[start..self.i]))
    }
}

/// Accumulates words into commands and commands into a pipeline.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    options: ParseOptions,
    pipeline: Pipeline,
    arguments: Vec<OsString>,
    previous_writes_to_pipe: bool,
}

impl PipelineBuilder {
    pub fn new(options: ParseOptions) -> Self {
        PipelineBuilder { options, ..Default::default() }
    }

    pub fn push_word(&mut self, word: &[u8]) -> Result<(), ParseError> {
        if let Some(limit) = self.options.max_args {
            if self.arguments.len() >= limit {
                return match self.options.overflow {
                    OverflowPolicy::Truncate => Ok(()),
                    OverflowPolicy::Reject => Err(ParseError::ArgumentOverflow {
                        program: self.arguments.first().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
                        limit,
                    }),
                };
            }
        }
        self.arguments.push(OsStr::from_bytes(word).to_os_string());
        Ok(())
    }

    pub fn push_delimiter(&mut self, delim: Delimiter) {
        if delim == Delimiter::Space || self.arguments.is_empty() {
            return;
        }
        let writes_to_pipe = delim == Delimiter::Pipe;
        let arguments = std::mem::take(&mut self.arguments);
        self.pipeline.push(Command::new(arguments, self.previous_writes_to_pipe, writes_to_pipe));
        self.previous_writes_to_pipe = writes_to_pipe;
    }

    pub fn finish(mut self) -> Pipeline {
        self.push_delimiter(Delimiter::End);
        self.pipeline
    }
}

/// Strips the line terminator left by the reader.
pub fn sanitize(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub fn parse<L: AsRef<[u8]> + ?Sized>(line: &L, options: &ParseOptions) -> Result<Pipeline, ParseError> {
    let mut builder = PipelineBuilder::new(*options);
    for token in Tokenizer::new(sanitize(line.as_ref())) {
        match token {
            Token::Word(w) => builder.push_word(w)?,
            Token::Delim(d) => builder.push_delimiter(d),
        }
    }
    Ok(builder.finish())
}
