// src/syntax/lexer.rs
// Python tokenizer with indentation tracking and incomplete-input detection
//
// The whole source is tokenized up front. The stream always ends in exactly
// one terminal token: EndMarker, Incomplete or Error. Nothing is produced
// after an Incomplete or Error token.

use super::fstring;
use super::token::{Keyword, OPERATORS, Op, Token, TokenKind};

const TAB_SIZE: usize = 8;

/// Maximum indentation depth (matches CPython's tokenizer)
pub const MAX_INDENT: usize = 100;

/// Maximum bracket nesting (matches CPython's tokenizer)
pub const MAX_PAREN_LEVEL: usize = 200;

/// Keywords that may directly follow a numeric literal (`1if x else y`)
const KEYWORDS_AFTER_NUMBER: &[&str] = &["and", "else", "for", "if", "in", "is", "not", "or"];

/// Terminal condition raised while lexing
struct Halt {
    kind: TokenKind,
    line: usize,
    column: usize,
}

pub struct Lexer {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    col: usize,
    /// (column, column with tabs counted as one) per open indentation level
    indents: Vec<(usize, usize)>,
    brackets: Vec<char>,
    at_line_start: bool,
    /// Last thing seen was a backslash line join
    continued: bool,
    fstring_depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::nested(source, 0)
    }

    /// Lexer for an expression embedded in an f-string at the given depth
    pub(crate) fn nested(source: &str, fstring_depth: usize) -> Self {
        let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
        Self {
            chars: normalized.chars().collect(),
            idx: 0,
            line: 1,
            col: 1,
            indents: vec![(0, 0)],
            brackets: Vec::new(),
            at_line_start: true,
            continued: false,
            fstring_depth,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        loop {
            match self.step() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(halt) => {
                    self.tokens
                        .push(Token::new(halt.kind, halt.line, halt.column));
                    return self.tokens;
                }
            }
        }
        self.finish();
        self.tokens
    }

    fn finish(&mut self) {
        let (line, col) = (self.line, self.col);
        if !self.brackets.is_empty() {
            self.tokens.push(Token::new(TokenKind::Incomplete, line, col));
            return;
        }
        let joined = self.continued;
        if !self.at_line_start {
            self.tokens.push(Token::new(TokenKind::Newline, line, col));
        }
        for _ in 1..self.indents.len() {
            self.tokens.push(Token::new(TokenKind::Dedent, line, col));
        }
        self.tokens.push(Token::new(
            TokenKind::EndMarker { joined },
            line,
            col,
        ));
    }

    // ═══════════════════════════════════════
    // CHARACTER CURSOR
    // ═══════════════════════════════════════

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.continued = false;
        self.tokens.push(Token::new(kind, line, column));
    }

    fn halt(&self, message: impl Into<String>) -> Halt {
        Self::halt_at(message, self.line, self.col)
    }

    fn halt_at(message: impl Into<String>, line: usize, column: usize) -> Halt {
        Halt {
            kind: TokenKind::Error(message.into()),
            line,
            column,
        }
    }

    fn incomplete(&self) -> Halt {
        Halt {
            kind: TokenKind::Incomplete,
            line: self.line,
            column: self.col,
        }
    }

    // ═══════════════════════════════════════
    // MAIN LOOP
    // ═══════════════════════════════════════

    /// Lex one token (or skip trivia). Returns Ok(false) at end of input.
    fn step(&mut self) -> Result<bool, Halt> {
        if self.at_line_start && self.brackets.is_empty() && !self.start_line()? {
            return Ok(false);
        }

        while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
            self.bump();
        }

        let Some(c) = self.peek() else {
            return Ok(false);
        };
        let (line, col) = (self.line, self.col);

        match c {
            '#' => {
                self.skip_comment();
                Ok(true)
            }
            '\\' => self.line_continuation(),
            '\n' => {
                self.bump();
                if self.brackets.is_empty() {
                    self.push(TokenKind::Newline, line, col);
                    self.at_line_start = true;
                }
                Ok(true)
            }
            '0'..='9' => self.number(),
            '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(),
            '\'' | '"' => self.string("", line, col),
            c if is_ident_start(c) => self.name(),
            _ => self.operator(),
        }
    }

    /// Measure indentation at the start of a logical line, skipping blank
    /// and comment-only lines. Returns false at end of input.
    fn start_line(&mut self) -> Result<bool, Halt> {
        loop {
            let mut col = 0;
            let mut alt = 0;
            // Column where a backslash first joined this line to the next;
            // zero counts as unset
            let mut joined_at = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => {
                        col += 1;
                        alt += 1;
                    }
                    '\t' => {
                        col = (col / TAB_SIZE + 1) * TAB_SIZE;
                        alt += 1;
                    }
                    '\x0c' => {
                        col = 0;
                        alt = 0;
                    }
                    '\\' if self.peek_at(1) == Some('\n') => {
                        if joined_at == 0 {
                            joined_at = col;
                        }
                        self.bump();
                        self.continued = true;
                    }
                    _ => break,
                }
                self.bump();
            }

            match self.peek() {
                None => return Ok(false),
                Some('#') => self.skip_comment(),
                Some('\n') => {}
                Some(_) => {
                    self.at_line_start = false;
                    if joined_at != 0 {
                        col = joined_at;
                        alt = joined_at;
                    }
                    self.indent_to(col, alt)?;
                    return Ok(true);
                }
            }

            // Blank or comment-only line
            if self.bump().is_none() {
                return Ok(false);
            }
        }
    }

    fn indent_to(&mut self, col: usize, alt: usize) -> Result<(), Halt> {
        let (line, start) = (self.line, self.col);
        let (top, alt_top) = self.indents.last().copied().unwrap_or((0, 0));

        if col == top {
            if alt != alt_top {
                return Err(self.tab_error());
            }
            return Ok(());
        }

        if col > top {
            if alt <= alt_top {
                return Err(self.tab_error());
            }
            if self.indents.len() > MAX_INDENT {
                return Err(self.halt("too many levels of indentation"));
            }
            self.indents.push((col, alt));
            self.push(TokenKind::Indent, line, start);
            return Ok(());
        }

        while self.indents.len() > 1 && self.indents.last().is_some_and(|(c, _)| col < *c) {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, start);
        }
        let (top, alt_top) = self.indents.last().copied().unwrap_or((0, 0));
        if col != top {
            return Err(self.halt("unindent does not match any outer indentation level"));
        }
        if alt != alt_top {
            return Err(self.tab_error());
        }
        Ok(())
    }

    fn tab_error(&self) -> Halt {
        self.halt("inconsistent use of tabs and spaces in indentation")
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn line_continuation(&mut self) -> Result<bool, Halt> {
        let (line, col) = (self.line, self.col);
        self.bump();
        match self.peek() {
            Some('\n') => {
                self.bump();
                self.continued = true;
                Ok(true)
            }
            None => Err(self.incomplete()),
            Some(_) => Err(Self::halt_at(
                "unexpected character after line continuation character",
                line,
                col,
            )),
        }
    }

    // ═══════════════════════════════════════
    // NAMES AND OPERATORS
    // ═══════════════════════════════════════

    fn name(&mut self) -> Result<bool, Halt> {
        let (line, col) = (self.line, self.col);
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            ident.push(c);
            self.bump();
        }

        if matches!(self.peek(), Some('\'' | '"')) && is_string_prefix(&ident) {
            return self.string(&ident, line, col);
        }

        let kind = match Keyword::lookup(&ident) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Name(ident),
        };
        self.push(kind, line, col);
        Ok(true)
    }

    fn operator(&mut self) -> Result<bool, Halt> {
        let (line, col) = (self.line, self.col);
        let rest = &self.chars[self.idx..];
        let found = OPERATORS
            .iter()
            .find(|(text, _)| rest.len() >= text.len() && text.chars().zip(rest).all(|(a, b)| a == *b));

        let Some((text, op)) = found.copied() else {
            let c = rest.first().copied().unwrap_or('\0');
            return Err(if c.is_control() {
                self.halt(format!("invalid non-printable character U+{:04X}", c as u32))
            } else {
                self.halt(format!("invalid character '{}' (U+{:04X})", c, c as u32))
            });
        };

        for _ in 0..text.len() {
            self.bump();
        }

        match op {
            Op::LParen | Op::LBracket | Op::LBrace => {
                if self.brackets.len() >= MAX_PAREN_LEVEL {
                    return Err(Self::halt_at("too many nested parentheses", line, col));
                }
                self.brackets.push(text.chars().next().unwrap_or('('));
            }
            Op::RParen | Op::RBracket | Op::RBrace => {
                let close = text.chars().next().unwrap_or(')');
                match self.brackets.pop() {
                    None => {
                        return Err(Self::halt_at(format!("unmatched '{}'", close), line, col));
                    }
                    Some(open) if closer_for(open) != close => {
                        return Err(Self::halt_at(
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                close, open
                            ),
                            line,
                            col,
                        ));
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }

        self.push(TokenKind::Op(op), line, col);
        Ok(true)
    }

    // ═══════════════════════════════════════
    // NUMBERS
    // ═══════════════════════════════════════

    fn number(&mut self) -> Result<bool, Halt> {
        let (line, col) = (self.line, self.col);

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => Some((16, "hexadecimal")),
                Some('o' | 'O') => Some((8, "octal")),
                Some('b' | 'B') => Some((2, "binary")),
                _ => None,
            };
            if let Some((radix, name)) = radix {
                self.bump();
                self.bump();
                if self.peek() == Some('_') {
                    self.bump();
                }
                if self.digits(radix, name)? == 0 {
                    return Err(self.halt(format!("invalid {} literal", name)));
                }
                if let Some(d) = self.peek().filter(|d| d.is_ascii_digit()) {
                    return Err(self.halt(format!("invalid digit '{}' in {} literal", d, name)));
                }
                self.check_number_end(name)?;
                self.push(TokenKind::Number { imaginary: false }, line, col);
                return Ok(true);
            }
        }

        let int_start = self.idx;
        if self.peek() != Some('.') {
            self.digits(10, "decimal")?;
        }
        let int_part: String = self.chars[int_start..self.idx]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            if self.peek().is_some_and(|d| d.is_ascii_digit()) {
                self.digits(10, "decimal")?;
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let digit_at = if matches!(self.peek_at(1), Some('+' | '-')) { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                self.digits(10, "decimal")?;
                is_float = true;
            } else if !self.keyword_follows() {
                return Err(self.halt("invalid decimal literal"));
            }
        }

        let imaginary = matches!(self.peek(), Some('j' | 'J'));
        if imaginary {
            self.bump();
            is_float = true;
        }

        if !is_float && int_part.len() > 1 && int_part.starts_with('0') && int_part.chars().any(|d| d != '0') {
            return Err(Self::halt_at(
                "leading zeros in decimal integer literals are not permitted; use an 0o prefix for octal integers",
                line,
                col,
            ));
        }

        self.check_number_end("decimal")?;
        self.push(TokenKind::Number { imaginary }, line, col);
        Ok(true)
    }

    /// Consume digits of the given radix with single underscores between
    /// them. Returns the number of digits read.
    fn digits(&mut self, radix: u32, name: &str) -> Result<usize, Halt> {
        let mut count = 0;
        loop {
            match self.peek() {
                Some(d) if d.is_digit(radix) => {
                    self.bump();
                    count += 1;
                }
                Some('_') => {
                    if !self.peek_at(1).is_some_and(|d| d.is_digit(radix)) {
                        return Err(self.halt(format!("invalid {} literal", name)));
                    }
                    self.bump();
                }
                _ => return Ok(count),
            }
        }
    }

    fn check_number_end(&self, name: &str) -> Result<(), Halt> {
        match self.peek() {
            Some(c) if is_ident_continue(c) && !self.keyword_follows() => {
                Err(self.halt(format!("invalid {} literal", name)))
            }
            _ => Ok(()),
        }
    }

    fn keyword_follows(&self) -> bool {
        let word: String = self.chars[self.idx..]
            .iter()
            .take_while(|c| is_ident_continue(**c))
            .collect();
        KEYWORDS_AFTER_NUMBER.contains(&word.as_str())
    }

    // ═══════════════════════════════════════
    // STRINGS
    // ═══════════════════════════════════════

    fn string(&mut self, prefix: &str, line: usize, col: usize) -> Result<bool, Halt> {
        let prefix = prefix.to_ascii_lowercase();
        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let formatted = prefix.contains('f');

        let Some(quote) = self.peek() else {
            return Err(self.incomplete());
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        for _ in 0..if triple { 3 } else { 1 } {
            self.bump();
        }

        let mut body = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(if triple {
                    self.incomplete()
                } else {
                    Self::halt_at(
                        format!("unterminated string literal (detected at line {})", self.line),
                        line,
                        col,
                    )
                });
            };

            match c {
                '\\' => {
                    self.bump();
                    let Some(next) = self.bump() else {
                        return Err(self.incomplete());
                    };
                    body.push('\\');
                    body.push(next);
                }
                '\n' if !triple => {
                    return Err(Self::halt_at(
                        format!("unterminated string literal (detected at line {})", line),
                        line,
                        col,
                    ));
                }
                q if q == quote => {
                    if !triple {
                        self.bump();
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.bump();
                        self.bump();
                        self.bump();
                        break;
                    }
                    body.push(q);
                    self.bump();
                }
                other => {
                    if bytes && !other.is_ascii() {
                        return Err(Self::halt_at(
                            "bytes can only contain ASCII literal characters",
                            line,
                            col,
                        ));
                    }
                    body.push(other);
                    self.bump();
                }
            }
        }

        let checked = if formatted {
            fstring::check(&body, raw, self.fstring_depth)
        } else if raw {
            Ok(Vec::new())
        } else {
            check_escapes(&body, bytes).map(|()| Vec::new())
        };
        let fields = checked.map_err(|message| Self::halt_at(message, line, col))?;

        self.push(
            TokenKind::String {
                bytes,
                formatted,
                fields,
            },
            line,
            col,
        );
        Ok(true)
    }
}

// ═══════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════

pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(ident: &str) -> bool {
    matches!(
        ident.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn check_escapes(body: &str, bytes: bool) -> Result<(), String> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += escape_len(&chars, i, bytes)?;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Validate the escape sequence starting at `chars[i]` (a backslash) and
/// return how many characters it spans.
pub(crate) fn escape_len(chars: &[char], i: usize, bytes: bool) -> Result<usize, String> {
    let hex_run = |start: usize, n: usize| {
        chars.len() >= start + n && chars[start..start + n].iter().all(|c| c.is_ascii_hexdigit())
    };

    match chars.get(i + 1) {
        None => Ok(1),
        Some('x') => {
            if hex_run(i + 2, 2) {
                Ok(4)
            } else if bytes {
                Err(format!("(value error) invalid \\x escape at position {}", i))
            } else {
                Err(format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: truncated \\xXX escape",
                    i,
                    i + 1
                ))
            }
        }
        Some('u') if !bytes => {
            if hex_run(i + 2, 4) {
                Ok(6)
            } else {
                Err(format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: truncated \\uXXXX escape",
                    i,
                    i + 1
                ))
            }
        }
        Some('U') if !bytes => {
            if !hex_run(i + 2, 8) {
                return Err(format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: truncated \\UXXXXXXXX escape",
                    i,
                    i + 1
                ));
            }
            let digits: String = chars[i + 2..i + 10].iter().collect();
            match u32::from_str_radix(&digits, 16) {
                Ok(value) if value <= 0x10FFFF => Ok(10),
                _ => Err(format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: illegal Unicode character",
                    i,
                    i + 9
                )),
            }
        }
        Some('N') if !bytes => {
            let malformed = || {
                format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: malformed \\N character escape",
                    i,
                    i + 1
                )
            };
            if chars.get(i + 2) != Some(&'{') {
                return Err(malformed());
            }
            let close = chars[i + 3..].iter().position(|c| *c == '}').ok_or_else(malformed)?;
            if close == 0 {
                return Err(malformed());
            }
            let name: String = chars[i + 3..i + 3 + close].iter().collect();
            if unicode_names2::character(&name.to_ascii_uppercase()).is_none() {
                return Err(format!(
                    "(unicode error) 'unicodeescape' codec can't decode bytes in position {}-{}: unknown Unicode character name",
                    i,
                    i + close + 3
                ));
            }
            Ok(close + 4)
        }
        Some(_) => Ok(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    fn last(source: &str) -> TokenKind {
        kinds(source).pop().unwrap()
    }

    fn is_error(source: &str) -> bool {
        matches!(last(source), TokenKind::Error(_))
    }

    // ============================================================================
    // Layout
    // ============================================================================

    #[test]
    fn test_simple_line() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Op(Op::Equal),
                TokenKind::Number { imaginary: false },
                TokenKind::Newline,
                TokenKind::EndMarker { joined: false },
            ]
        );
    }

    #[test]
    fn test_indent_and_implied_dedent() {
        let k = kinds("if x:\n    y");
        assert!(k.contains(&TokenKind::Indent));
        assert_eq!(k[k.len() - 2], TokenKind::Dedent);
    }

    #[test]
    fn test_trailing_newlines_end_the_stream_alike() {
        for src in ["if x:", "if x:\n", "if x:\n   ", "if x:\n\n"] {
            assert_eq!(last(src), TokenKind::EndMarker { joined: false }, "{:?}", src);
        }
    }

    #[test]
    fn test_comment_lines_produce_no_tokens() {
        assert_eq!(
            kinds("# just a comment\nx # trailing"),
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Newline,
                TokenKind::EndMarker { joined: false },
            ]
        );
    }

    #[test]
    fn test_bad_dedent() {
        assert!(is_error("if x:\n    y\n  z"));
    }

    #[test]
    fn test_tab_space_mix() {
        assert!(is_error("if x:\n\ty\n        z"));
    }

    #[test]
    fn test_too_many_indents() {
        let mut src = String::new();
        for depth in 0..=MAX_INDENT + 1 {
            src.push_str(&" ".repeat(depth));
            src.push_str("if x:\n");
        }
        assert!(is_error(&src));
    }

    // ============================================================================
    // Brackets and continuation
    // ============================================================================

    #[test]
    fn test_open_bracket_is_incomplete() {
        assert_eq!(last("x = (1 +"), TokenKind::Incomplete);
        assert_eq!(last("foo(1,\n  2,\n"), TokenKind::Incomplete);
    }

    #[test]
    fn test_mismatched_bracket() {
        assert!(is_error("x = (1]"));
        assert!(is_error("x = 1)"));
    }

    #[test]
    fn test_bracket_nesting_limit() {
        let deep = "(".repeat(MAX_PAREN_LEVEL + 1);
        assert!(is_error(&deep));
        let ok = "(".repeat(MAX_PAREN_LEVEL);
        assert_eq!(last(&ok), TokenKind::Incomplete);
    }

    #[test]
    fn test_backslash_continuation() {
        assert_eq!(last("x = 1 + \\"), TokenKind::Incomplete);
        assert_eq!(last("x = 1 + \\\n"), TokenKind::EndMarker { joined: true });
        assert_eq!(last("x = 1 + \\\n  2"), TokenKind::EndMarker { joined: false });
        assert!(is_error("x = 1 \\ 2"));
    }

    #[test]
    fn test_joined_indentation_keeps_first_line_column() {
        // A join at column zero leaves the next line's spaces counting
        assert_eq!(kinds("\\\n x")[0], TokenKind::Indent);

        let k = kinds("if x:\n    \\\n  y");
        assert_eq!(k.iter().filter(|t| **t == TokenKind::Indent).count(), 1);
        assert!(!is_error("if x:\n    \\\n  y"));
    }

    #[test]
    fn test_imaginary_flag() {
        assert_eq!(kinds("3j")[0], TokenKind::Number { imaginary: true });
        assert_eq!(kinds("1.5")[0], TokenKind::Number { imaginary: false });
        assert_eq!(kinds("0x1f")[0], TokenKind::Number { imaginary: false });
    }

    // ============================================================================
    // Numbers
    // ============================================================================

    #[test]
    fn test_valid_numbers() {
        for src in ["0", "00", "1_000", "0x_ff", "0o17", "0b1010", "1.5", ".5", "1.", "1e10", "1E-3", "3j", "1.5J", "1if x else y"] {
            assert!(!is_error(src), "{} should lex", src);
        }
    }

    #[test]
    fn test_invalid_numbers() {
        for src in ["01", "0b102", "0o8", "1__0", "1_", "1e", "0x", "1abc", "1.real"] {
            assert!(is_error(src), "{} should be rejected", src);
        }
    }

    // ============================================================================
    // Strings
    // ============================================================================

    #[test]
    fn test_unterminated_single_quote() {
        assert!(is_error("x = 'abc"));
        assert!(is_error("x = 'abc\ny'"));
    }

    #[test]
    fn test_joined_single_quote_at_end_is_unterminated() {
        assert!(is_error("x = 'a\\\n"));
        assert_eq!(last("x = 'a\\"), TokenKind::Incomplete);
        assert!(!is_error("x = 'a\\\nb'"));
        assert_eq!(last("x = '''a\\\n"), TokenKind::Incomplete);
    }

    #[test]
    fn test_open_triple_quote_is_incomplete() {
        assert_eq!(last("x = '''abc\n"), TokenKind::Incomplete);
        assert_eq!(last("x = \"\"\"abc"), TokenKind::Incomplete);
    }

    #[test]
    fn test_fstring_fields_travel_with_the_token() {
        assert_eq!(
            kinds("f'{a}-{b:{w}}'")[0],
            TokenKind::String {
                bytes: false,
                formatted: true,
                fields: vec!["a".into(), "b".into(), "w".into()],
            }
        );
    }

    #[test]
    fn test_string_prefixes() {
        assert!(!is_error("rb'\\d'"));
        assert!(!is_error("u'text'"));
        assert_eq!(kinds("ur'x'")[0], TokenKind::Name("ur".into()));
    }

    #[test]
    fn test_bytes_must_be_ascii() {
        assert!(is_error("b'caf\u{e9}'"));
        assert!(!is_error("'caf\u{e9}'"));
    }

    #[test]
    fn test_escape_validation() {
        assert!(is_error(r"'\x4'"));
        assert!(is_error(r"'\u12'"));
        assert!(is_error(r"'\N'"));
        assert!(!is_error(r"'\N{BULLET}'"));
        assert!(!is_error(r"'\N{em dash}'"));
        assert!(is_error(r"'\N{DASH}'"));
        assert!(is_error(r"'\N{}'"));
        assert!(!is_error(r"b'\u12'"));
        assert!(!is_error(r"r'\x'"));
        assert!(!is_error(r"'\q'"));
    }

    #[test]
    fn test_invalid_character() {
        assert!(is_error("x = $"));
        assert!(is_error("x ? y"));
        assert!(is_error("!x"));
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("x = 1\ny = (").tokenize();
        let y = &tokens[4];
        assert_eq!(y.kind, TokenKind::Name("y".into()));
        assert_eq!((y.line, y.column), (2, 1));
    }
}
