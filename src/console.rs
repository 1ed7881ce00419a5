// src/console.rs
// Interactive line accumulation for a Python prompt
//
// Each Enter either continues the buffer or submits it. A single line keeps
// going while it is incomplete; a multi-line buffer keeps going until a
// blank line is entered.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::syntax::{Classification, ClassifyError, classify};

const PROMPT: &str = ">>> ";
const CONTINUATION_PROMPT: &str = "... ";

/// What the caller should do after a line is entered
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Keep reading lines into the same buffer
    Continue,
    /// The buffer is finished; it has been cleared
    Submit {
        source: String,
        status: Result<Classification, ClassifyError>,
    },
}

/// Classify a pending buffer the way the prompt does.
///
/// A multi-line buffer whose last line is not empty is treated as
/// incomplete without parsing, so blocks only end on a blank line.
pub fn check_buffer(source: &str) -> Result<Classification, ClassifyError> {
    if source.contains('\n') && !source.ends_with('\n') {
        return Ok(Classification::Incomplete);
    }
    classify(source)
}

/// Lines entered since the last submission
#[derive(Debug, Default)]
pub struct InputBuffer {
    lines: Vec<String>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn prompt(&self) -> &'static str {
        if self.lines.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        }
    }

    pub fn push_line(&mut self, line: &str) -> LineOutcome {
        self.lines.push(line.to_string());
        let joined = self.lines.join("\n");
        let status = check_buffer(&joined);

        let has_content = !line.trim().is_empty();
        let continues = if self.lines.len() == 1 {
            status == Ok(Classification::Incomplete)
        } else {
            has_content
        };
        if continues {
            return LineOutcome::Continue;
        }

        debug!(lines = self.lines.len(), "submitting buffer");
        self.lines.clear();
        LineOutcome::Submit {
            source: joined.trim().to_string(),
            status,
        }
    }

    /// Drop pending lines (Ctrl-C)
    pub fn reset(&mut self) {
        self.lines.clear();
    }
}

/// Run the interactive console until Ctrl-D
pub fn run() -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut buffer = InputBuffer::new();

    println!("Enter Python code; a blank line ends a block (Ctrl+D to exit)");

    loop {
        let line = match editor.readline(buffer.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                buffer.reset();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        if buffer.is_empty() && line.trim().is_empty() {
            continue;
        }

        if let LineOutcome::Submit { source, status } = buffer.push_line(&line) {
            if !source.is_empty() {
                let _ = editor.add_history_entry(source.as_str());
            }
            match status {
                Ok(label) => println!("{}", label),
                Err(err) => println!("error: {}", err),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(outcome: LineOutcome) -> (String, Classification) {
        match outcome {
            LineOutcome::Submit { source, status } => (source, status.unwrap()),
            LineOutcome::Continue => panic!("expected submission"),
        }
    }

    // ============================================================================
    // check_buffer
    // ============================================================================

    #[test]
    fn test_check_buffer_defers_multiline() {
        assert_eq!(check_buffer("if x:\n    y"), Ok(Classification::Incomplete));
        assert_eq!(check_buffer("if x:\n    y\n"), Ok(Classification::Complete));
        assert_eq!(check_buffer("x = 1"), Ok(Classification::Complete));
    }

    // ============================================================================
    // InputBuffer
    // ============================================================================

    #[test]
    fn test_single_complete_line_submits() {
        let mut buffer = InputBuffer::new();
        let (source, status) = submitted(buffer.push_line("print(1)"));
        assert_eq!(source, "print(1)");
        assert_eq!(status, Classification::Complete);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_single_invalid_line_submits() {
        let mut buffer = InputBuffer::new();
        let (_, status) = submitted(buffer.push_line("x = = 1"));
        assert_eq!(status, Classification::Invalid);
    }

    #[test]
    fn test_block_ends_on_blank_line() {
        let mut buffer = InputBuffer::new();
        assert_eq!(buffer.push_line("for i in range(3):"), LineOutcome::Continue);
        assert_eq!(buffer.prompt(), CONTINUATION_PROMPT);
        assert_eq!(buffer.push_line("    print(i)"), LineOutcome::Continue);
        let (source, status) = submitted(buffer.push_line(""));
        assert_eq!(source, "for i in range(3):\n    print(i)");
        assert_eq!(status, Classification::Complete);
        assert_eq!(buffer.prompt(), PROMPT);
    }

    #[test]
    fn test_header_then_blank_line_submits_incomplete() {
        let mut buffer = InputBuffer::new();
        assert_eq!(buffer.push_line("if x:"), LineOutcome::Continue);
        let (_, status) = submitted(buffer.push_line(""));
        assert_eq!(status, Classification::Incomplete);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_open_bracket_continues() {
        let mut buffer = InputBuffer::new();
        assert_eq!(buffer.push_line("total = sum(["), LineOutcome::Continue);
        assert_eq!(buffer.push_line("    1, 2,"), LineOutcome::Continue);
        assert_eq!(buffer.push_line("])"), LineOutcome::Continue);
        let (source, status) = submitted(buffer.push_line(""));
        assert_eq!(source, "total = sum([\n    1, 2,\n])");
        assert_eq!(status, Classification::Complete);
    }

    #[test]
    fn test_reset_discards_lines() {
        let mut buffer = InputBuffer::new();
        buffer.push_line("def f():");
        buffer.reset();
        assert!(buffer.is_empty());
        let (_, status) = submitted(buffer.push_line("x = 2"));
        assert_eq!(status, Classification::Complete);
    }
}
