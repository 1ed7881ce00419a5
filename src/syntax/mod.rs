// src/syntax/mod.rs
// Python syntax classification under interactive-compile semantics

mod fstring;
mod lexer;
mod parser;
mod token;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::thread;
use thiserror::Error;
use tracing::{debug, Span};

use lexer::Lexer;
use parser::{Failure, Parser};
use token::TokenKind;

pub use parser::MAX_DEPTH;

/// Stack for the classification worker, sized so the parser reaches
/// MAX_DEPTH before the stack runs out
const CLASSIFY_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Three-way verdict for a source snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// One full statement that compiles
    Complete,
    /// Valid so far, but more lines are needed
    Incomplete,
    /// A syntax error no further input can fix
    Invalid,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "incomplete" => Ok(Self::Incomplete),
            "invalid" => Ok(Self::Invalid),
            other => Err(format!("unknown classification: {}", other)),
        }
    }
}

/// Failures that are not syntax errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("source is too deeply nested to classify (limit {limit})")]
    TooComplex { limit: usize },

    #[error("classification worker failed: {0}")]
    Worker(String),
}

/// Classify `source` as a complete, incomplete or invalid Python statement.
///
/// Follows interactive-compile rules: exactly one statement is accepted,
/// input ending inside an open construct is incomplete, and the first
/// syntax error decides the result. Input made only of blank lines and
/// comments is incomplete. The source is never executed.
///
/// Parsing runs on a dedicated thread with a large stack; the calling
/// thread blocks until it finishes.
pub fn classify(source: &str) -> Result<Classification, ClassifyError> {
    let span = Span::current();
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("classify".into())
            .stack_size(CLASSIFY_STACK_SIZE)
            .spawn_scoped(scope, || span.in_scope(|| classify_tokens(source)))
            .map_err(|e| ClassifyError::Worker(e.to_string()))?;
        worker
            .join()
            .map_err(|_| ClassifyError::Worker("classification worker panicked".into()))?
    })
}

fn classify_tokens(source: &str) -> Result<Classification, ClassifyError> {
    if is_blank(source) {
        return Ok(Classification::Incomplete);
    }
    if source.contains('\0') {
        debug!("source contains a null byte");
        return Ok(Classification::Invalid);
    }

    let tokens = Lexer::new(source).tokenize();
    // The tokenizer's own limits are syntax errors even when the parser
    // exhausts its budget before reaching them
    let lexical_error = tokens
        .last()
        .is_some_and(|t| matches!(t.kind, TokenKind::Error(_)));

    match Parser::new(tokens).parse_interactive() {
        Ok(()) => Ok(Classification::Complete),
        Err(Failure::Incomplete) => Ok(Classification::Incomplete),
        Err(Failure::Invalid { message, line, column }) => {
            debug!(line, column, reason = %message, "source classified as invalid");
            Ok(Classification::Invalid)
        }
        Err(Failure::TooComplex) if lexical_error => {
            debug!("source hit a tokenizer limit");
            Ok(Classification::Invalid)
        }
        Err(Failure::TooComplex) => Err(ClassifyError::TooComplex { limit: MAX_DEPTH }),
    }
}

fn is_blank(source: &str) -> bool {
    source.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}
