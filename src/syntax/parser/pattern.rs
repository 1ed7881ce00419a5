// src/syntax/parser/pattern.rs
// `match` statements and the pattern language

use super::{PResult, Parser};
use crate::syntax::token::{Keyword, Op, Token, TokenKind};

/// Whether a case pattern always matches
#[derive(Debug, Clone, PartialEq, Eq)]
enum Refutability {
    Refutable,
    Wildcard,
    Capture(String),
}

impl Refutability {
    fn is_irrefutable(&self) -> bool {
        !matches!(self, Refutability::Refutable)
    }

    fn unreachable_message(&self) -> String {
        match self {
            Refutability::Capture(name) => {
                format!("name capture '{}' makes remaining patterns unreachable", name)
            }
            _ => "wildcard makes remaining patterns unreachable".to_string(),
        }
    }
}

impl Parser {
    /// Try `match` as a statement keyword. Returns Ok(false) after rewinding
    /// when the line is an ordinary statement using `match` as a name.
    pub(super) fn parse_match(&mut self) -> PResult<bool> {
        let checkpoint = self.checkpoint();
        self.bump();
        let subject = self.attempt(|p| {
            p.parse_match_subject()?;
            if p.at_op(Op::Colon) {
                Ok(())
            } else {
                Err(p.invalid_here("expected ':'"))
            }
        })?;
        if subject.is_none() {
            self.rewind(checkpoint);
            return Ok(false);
        }

        self.bump();
        self.expect_newline()?;
        self.expect_indent()?;

        let mut irrefutable: Option<(Token, Refutability)> = None;
        loop {
            if !self.peek().is_name("case") {
                return Err(self.expected("'case' block"));
            }
            let tok = self.bump();
            if let Some((at, earlier)) = &irrefutable {
                let (at, message) = (at.clone(), earlier.unreachable_message());
                self.defer(&at, message);
            }
            let refutability = self.parse_case_body()?;
            if refutability.is_irrefutable() && irrefutable.is_none() {
                irrefutable = Some((tok, refutability));
            }
            if self.peek().kind == TokenKind::Dedent {
                self.bump();
                return Ok(true);
            }
        }
    }

    fn parse_match_subject(&mut self) -> PResult<()> {
        let first = self.parse_star_named_expression_for_subject()?;
        if self.eat_op(Op::Comma) {
            while self.starts_expression() {
                self.parse_star_named_expression_for_subject()?;
                if !self.eat_op(Op::Comma) {
                    break;
                }
            }
        } else if first {
            return Err(self.invalid_here("starred subject must be part of a tuple"));
        }
        Ok(())
    }

    /// Returns whether the element was starred
    fn parse_star_named_expression_for_subject(&mut self) -> PResult<bool> {
        if self.eat_op(Op::Star) {
            self.parse_bitwise_or()?;
            return Ok(true);
        }
        self.parse_named_expression()?;
        Ok(false)
    }

    /// Patterns, optional guard and block after `case`
    fn parse_case_body(&mut self) -> PResult<Refutability> {
        let refutability = self.parse_patterns()?;
        let guarded = self.eat_kw(Keyword::If);
        if guarded {
            self.parse_named_expression()?;
        }
        self.parse_block()?;
        Ok(if guarded {
            Refutability::Refutable
        } else {
            refutability
        })
    }

    fn parse_patterns(&mut self) -> PResult<Refutability> {
        let start = self.peek().clone();
        let (first, starred) = self.parse_maybe_star_pattern()?;
        if !self.at_op(Op::Comma) {
            if starred {
                return Err(Self::invalid_at(&start, "can't use starred pattern here"));
            }
            return Ok(first);
        }

        let mut stars = usize::from(starred);
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::Colon) || self.at_kw(Keyword::If) {
                break;
            }
            let (_, starred) = self.parse_maybe_star_pattern()?;
            stars += usize::from(starred);
        }
        if stars > 1 {
            return Err(Self::invalid_at(&start, "multiple starred names in sequence pattern"));
        }
        Ok(Refutability::Refutable)
    }

    fn parse_maybe_star_pattern(&mut self) -> PResult<(Refutability, bool)> {
        if self.eat_op(Op::Star) {
            let name = self.expect_name()?;
            if name != "_" {
                self.symbols.bind(&name);
            }
            return Ok((Refutability::Refutable, true));
        }
        Ok((self.parse_as_pattern()?, false))
    }

    fn parse_as_pattern(&mut self) -> PResult<Refutability> {
        self.nested(|p| {
            let pattern = p.parse_or_pattern()?;
            if !p.eat_kw(Keyword::As) {
                return Ok(pattern);
            }
            let tok = p.peek().clone();
            let name = p.expect_name()?;
            if name == "_" {
                return Err(Self::invalid_at(&tok, "cannot use '_' as a target"));
            }
            p.symbols.bind(&name);
            Ok(if pattern.is_irrefutable() {
                Refutability::Capture(name)
            } else {
                Refutability::Refutable
            })
        })
    }

    fn parse_or_pattern(&mut self) -> PResult<Refutability> {
        let mut start = self.peek().clone();
        let mut pattern = self.parse_closed_pattern()?;
        while self.at_op(Op::VBar) {
            if pattern.is_irrefutable() {
                return Err(Self::invalid_at(&start, pattern.unreachable_message()));
            }
            self.bump();
            start = self.peek().clone();
            pattern = self.parse_closed_pattern()?;
        }
        Ok(pattern)
    }

    fn parse_closed_pattern(&mut self) -> PResult<Refutability> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Op(Op::Minus) | TokenKind::Number { .. } => self.parse_signed_number()?,
            TokenKind::String { .. } => self.parse_literal_strings()?,
            TokenKind::Keyword(Keyword::None | Keyword::True | Keyword::False) => {
                self.bump();
            }
            TokenKind::Name(name) => {
                self.bump();
                let dotted = self.at_op(Op::Dot);
                while self.eat_op(Op::Dot) {
                    self.expect_name()?;
                }
                let called = self.eat_op(Op::LParen);
                if !dotted && !called {
                    if name == "_" {
                        return Ok(Refutability::Wildcard);
                    }
                    self.symbols.bind(name);
                    return Ok(Refutability::Capture(name.clone()));
                }
                self.symbols.use_name(name);
                if called {
                    self.parse_class_pattern_arguments()?;
                }
            }
            TokenKind::Op(Op::LParen) => return self.parse_group_or_sequence_pattern(),
            TokenKind::Op(Op::LBracket) => {
                self.bump();
                self.parse_sequence_pattern_items(Op::RBracket, "']'")?;
            }
            TokenKind::Op(Op::LBrace) => self.parse_mapping_pattern()?,
            _ => return Err(self.unexpected()),
        }
        Ok(Refutability::Refutable)
    }

    /// `-1`, `2.5`, `1+2j`, `-1-2j`
    fn parse_signed_number(&mut self) -> PResult<()> {
        self.eat_op(Op::Minus);
        let real = self.peek().clone();
        let TokenKind::Number { imaginary } = real.kind else {
            return Err(self.unexpected());
        };
        self.bump();
        if !(self.at_op(Op::Plus) || self.at_op(Op::Minus)) {
            return Ok(());
        }
        if imaginary {
            return Err(Self::invalid_at(&real, "real number required in complex literal"));
        }
        self.bump();
        let imag = self.peek().clone();
        match imag.kind {
            TokenKind::Number { imaginary: true } => {
                self.bump();
                Ok(())
            }
            TokenKind::Number { imaginary: false } => Err(Self::invalid_at(
                &imag,
                "imaginary number required in complex literal",
            )),
            _ => Err(self.expected("an imaginary number")),
        }
    }

    /// Adjacent string literals in a pattern; f-strings are not literals
    fn parse_literal_strings(&mut self) -> PResult<()> {
        let mut i = self.idx;
        while let Some(TokenKind::String { formatted, .. }) = self.tokens.get(i).map(|t| &t.kind) {
            if *formatted {
                return Err(Self::invalid_at(
                    &self.tokens[i],
                    "patterns may only match literals and attribute lookups",
                ));
            }
            i += 1;
        }
        self.parse_strings().map(|_| ())
    }

    fn parse_group_or_sequence_pattern(&mut self) -> PResult<Refutability> {
        self.bump();
        if self.eat_op(Op::RParen) {
            return Ok(Refutability::Refutable);
        }
        let (first, starred) = self.parse_maybe_star_pattern()?;
        if !starred && self.eat_op(Op::RParen) {
            return Ok(first);
        }
        if !self.eat_op(Op::Comma) {
            self.expect_op(Op::RParen, "')'")?;
            return Ok(Refutability::Refutable);
        }
        let stars = usize::from(starred) + self.parse_sequence_pattern_items(Op::RParen, "')'")?;
        if stars > 1 {
            return Err(self.invalid_here("multiple starred names in sequence pattern"));
        }
        Ok(Refutability::Refutable)
    }

    /// Items up to and including `close`. Returns the number of star items.
    fn parse_sequence_pattern_items(&mut self, close: Op, what: &str) -> PResult<usize> {
        let start = self.peek().clone();
        let mut stars = 0;
        loop {
            if self.eat_op(close) {
                break;
            }
            let (_, starred) = self.parse_maybe_star_pattern()?;
            stars += usize::from(starred);
            if !self.eat_op(Op::Comma) {
                self.expect_op(close, what)?;
                break;
            }
        }
        if stars > 1 {
            return Err(Self::invalid_at(&start, "multiple starred names in sequence pattern"));
        }
        Ok(stars)
    }

    fn parse_mapping_pattern(&mut self) -> PResult<()> {
        self.bump();
        loop {
            if self.eat_op(Op::RBrace) {
                return Ok(());
            }
            if self.eat_op(Op::DoubleStar) {
                let rest = self.expect_name()?;
                self.symbols.bind(&rest);
                self.eat_op(Op::Comma);
                return self.expect_op(Op::RBrace, "'}'");
            }
            self.parse_mapping_key()?;
            self.expect_op(Op::Colon, "':'")?;
            self.parse_as_pattern()?;
            if !self.eat_op(Op::Comma) {
                return self.expect_op(Op::RBrace, "'}'");
            }
        }
    }

    fn parse_mapping_key(&mut self) -> PResult<()> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Op(Op::Minus) | TokenKind::Number { .. } => self.parse_signed_number(),
            TokenKind::String { .. } => self.parse_literal_strings(),
            TokenKind::Keyword(Keyword::None | Keyword::True | Keyword::False) => {
                self.bump();
                Ok(())
            }
            TokenKind::Name(_) if self.peek_nth(1).is_op(Op::Dot) => {
                self.bump();
                while self.eat_op(Op::Dot) {
                    self.expect_name()?;
                }
                Ok(())
            }
            TokenKind::Name(_) => Err(Self::invalid_at(
                &tok,
                "mapping pattern keys may only match literals and attribute lookups",
            )),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_class_pattern_arguments(&mut self) -> PResult<()> {
        let mut seen_keyword = false;
        loop {
            if self.eat_op(Op::RParen) {
                return Ok(());
            }
            let tok = self.peek().clone();
            if matches!(tok.kind, TokenKind::Name(_)) && self.peek_nth(1).is_op(Op::Equal) {
                self.bump();
                self.bump();
                self.parse_as_pattern()?;
                seen_keyword = true;
            } else {
                if seen_keyword {
                    return Err(Self::invalid_at(&tok, "positional patterns follow keyword patterns"));
                }
                self.parse_as_pattern()?;
            }
            if !self.eat_op(Op::Comma) {
                return self.expect_op(Op::RParen, "')'");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Failure;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    fn parse(source: &str) -> Result<(), Failure> {
        Parser::new(Lexer::new(source).tokenize()).parse_interactive()
    }

    fn ok(source: &str) -> bool {
        parse(source).is_ok()
    }

    fn message(source: &str) -> String {
        match parse(source) {
            Err(Failure::Invalid { message, .. }) => message,
            other => panic!("expected invalid for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_match_statement() {
        let source = "match command.split():\n    case [action]:\n        pass\n    case [\"go\", direction] if direction:\n        pass\n    case Point(x=0, y=0) | Point(x=1):\n        pass\n    case {\"k\": v, **rest}:\n        pass\n    case (1 | 2) as n:\n        pass\n    case -1 | 3.5 | 1+2j | None | Color.RED:\n        pass\n    case [first, *others]:\n        pass\n    case _:\n        pass";
        assert!(ok(source), "{:?}", parse(source));
    }

    #[test]
    fn test_match_awaits_cases() {
        assert_eq!(parse("match x:"), Err(Failure::Incomplete));
        assert_eq!(parse("match x:\n    case 1:"), Err(Failure::Incomplete));
        assert_eq!(parse("match x:\n    case 1:\n"), Err(Failure::Incomplete));
    }

    #[test]
    fn test_irrefutable_case_must_be_last() {
        assert_eq!(
            message("match x:\n    case y:\n        pass\n    case 1:\n        pass"),
            "name capture 'y' makes remaining patterns unreachable"
        );
        assert_eq!(
            message("match x:\n    case _:\n        pass\n    case 1:\n        pass"),
            "wildcard makes remaining patterns unreachable"
        );
        assert!(ok("match x:\n    case y if y:\n        pass\n    case 1:\n        pass"));
    }

    #[test]
    fn test_pattern_errors() {
        assert!(matches!(parse("match x:\n    case [*a, *b]:\n        pass"), Err(Failure::Invalid { .. })));
        assert!(matches!(parse("match x:\n    case {a: 1}:\n        pass"), Err(Failure::Invalid { .. })));
        assert!(matches!(parse("match x:\n    case C(a=1, b):\n        pass"), Err(Failure::Invalid { .. })));
        assert!(matches!(parse("match x:\n    case 1 as _:\n        pass"), Err(Failure::Invalid { .. })));
        assert!(matches!(parse("match x:\n    y = 1"), Err(Failure::Invalid { .. })));
    }

    #[test]
    fn test_complex_literal_patterns() {
        assert!(ok("match x:\n    case 1+2j | -1-2.5j:\n        pass"));
        assert_eq!(
            message("match x:\n    case 1+2:\n        pass"),
            "imaginary number required in complex literal"
        );
        assert_eq!(
            message("match x:\n    case 1j+2j:\n        pass"),
            "real number required in complex literal"
        );
    }

    #[test]
    fn test_fstring_is_not_a_literal_pattern() {
        assert_eq!(
            message("match x:\n    case f'x':\n        pass"),
            "patterns may only match literals and attribute lookups"
        );
        assert_eq!(
            message("match x:\n    case {'a' f'b': 1}:\n        pass"),
            "patterns may only match literals and attribute lookups"
        );
        assert!(ok("match x:\n    case 'a' 'b':\n        pass"));
    }

    #[test]
    fn test_captures_bind_names() {
        assert_eq!(
            message("def f(x):\n    match x:\n        case [y, *z]:\n            pass\n    global z"),
            "name 'z' is assigned to before global declaration"
        );
        assert_eq!(
            message("def f(x):\n    match x:\n        case {**rest}:\n            pass\n    global rest"),
            "name 'rest' is assigned to before global declaration"
        );
    }

    #[test]
    fn test_match_as_identifier() {
        assert!(ok("match.group(1)"));
        assert!(ok("match[0] = 1"));
        assert!(ok("print(match, case)"));
    }
}
