// src/syntax/parser/expr.rs
// Expression grammar

use super::symbols::{BlockKind, Mark};
use super::target::{ExprKind, TargetKind};
use super::{Context, Expr, PResult, ParamStyle, Parser, Scope};
use crate::syntax::token::{Keyword, Op, Token, TokenKind};

/// Binding power of binary operators, loosest first
fn binary_precedence(op: Op) -> Option<u8> {
    let prec = match op {
        Op::VBar => 1,
        Op::Circumflex => 2,
        Op::Amp => 3,
        Op::LeftShift | Op::RightShift => 4,
        Op::Plus | Op::Minus => 5,
        Op::Star | Op::Slash | Op::DoubleSlash | Op::Percent | Op::At => 6,
        _ => return None,
    };
    Some(prec)
}

impl Parser {
    /// Whether the current token can begin an expression
    pub(super) fn starts_expression(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Name(_) | TokenKind::Number { .. } | TokenKind::String { .. } => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::None
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Not
                    | Keyword::Lambda
                    | Keyword::Await
                    | Keyword::Yield
            ),
            TokenKind::Op(op) => matches!(
                op,
                Op::LParen
                    | Op::LBracket
                    | Op::LBrace
                    | Op::Minus
                    | Op::Plus
                    | Op::Tilde
                    | Op::Star
                    | Op::Ellipsis
            ),
            _ => false,
        }
    }

    // ═══════════════════════════════════════
    // LISTS OF EXPRESSIONS
    // ═══════════════════════════════════════

    pub(super) fn parse_star_expressions_or_yield(&mut self) -> PResult<Expr> {
        if self.at_kw(Keyword::Yield) {
            return self.parse_yield();
        }
        self.parse_star_expressions()
    }

    /// Comma-separated expressions; a trailing comma makes a tuple
    pub(super) fn parse_star_expressions(&mut self) -> PResult<Expr> {
        let first = self.parse_star_expression()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_star_expression()?);
        }
        Ok(Expr::Tuple(elts))
    }

    pub(super) fn parse_star_expression(&mut self) -> PResult<Expr> {
        if self.eat_op(Op::Star) {
            let inner = self.parse_bitwise_or()?;
            return Ok(Expr::Starred(Box::new(inner)));
        }
        self.parse_expression()
    }

    fn parse_star_named_expression(&mut self) -> PResult<Expr> {
        if self.eat_op(Op::Star) {
            let inner = self.parse_bitwise_or()?;
            return Ok(Expr::Starred(Box::new(inner)));
        }
        self.parse_named_expression()
    }

    /// Targets of a `for` clause, stopping before `in`
    pub(super) fn parse_target_list(&mut self) -> PResult<Expr> {
        let first = self.parse_target_element()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_target_element()?);
        }
        Ok(Expr::Tuple(elts))
    }

    pub(super) fn parse_target_element(&mut self) -> PResult<Expr> {
        if self.eat_op(Op::Star) {
            let inner = self.parse_bitwise_or()?;
            return Ok(Expr::Starred(Box::new(inner)));
        }
        self.parse_bitwise_or()
    }

    // ═══════════════════════════════════════
    // PRECEDENCE LEVELS
    // ═══════════════════════════════════════

    pub(super) fn parse_named_expression(&mut self) -> PResult<Expr> {
        if let TokenKind::Name(name) = &self.peek().kind {
            if self.peek_nth(1).is_op(Op::ColonEqual) {
                let name = name.clone();
                let tok = self.bump();
                self.bump();
                self.parse_expression()?;
                self.symbols.named_expr(&name, &tok);
                return Ok(Expr::Other(ExprKind::NamedExpr));
            }
        }
        let start = self.peek().clone();
        let expr = self.parse_expression()?;
        if self.at_op(Op::ColonEqual) {
            return Err(Self::invalid_at(
                &start,
                format!("cannot use assignment expressions with {}", expr.describe()),
            ));
        }
        Ok(expr)
    }

    pub(super) fn parse_expression(&mut self) -> PResult<Expr> {
        self.nested(|p| {
            if p.at_kw(Keyword::Lambda) {
                return p.parse_lambda();
            }
            let body = p.parse_disjunction()?;
            if !p.eat_kw(Keyword::If) {
                return Ok(body);
            }
            p.parse_disjunction()?;
            if !p.eat_kw(Keyword::Else) {
                return Err(p.expected("'else' after 'if' expression"));
            }
            p.parse_expression()?;
            Ok(Expr::Other(ExprKind::Conditional))
        })
    }

    fn parse_disjunction(&mut self) -> PResult<Expr> {
        let first = self.parse_conjunction()?;
        if !self.at_kw(Keyword::Or) {
            return Ok(first);
        }
        while self.eat_kw(Keyword::Or) {
            self.parse_conjunction()?;
        }
        Ok(Expr::Other(ExprKind::Operator))
    }

    fn parse_conjunction(&mut self) -> PResult<Expr> {
        let first = self.parse_inversion()?;
        if !self.at_kw(Keyword::And) {
            return Ok(first);
        }
        while self.eat_kw(Keyword::And) {
            self.parse_inversion()?;
        }
        Ok(Expr::Other(ExprKind::Operator))
    }

    fn parse_inversion(&mut self) -> PResult<Expr> {
        if self.eat_kw(Keyword::Not) {
            self.nested(|p| p.parse_inversion())?;
            return Ok(Expr::Other(ExprKind::Operator));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let first = self.parse_bitwise_or()?;
        let mut compared = false;
        loop {
            match &self.peek().kind {
                TokenKind::Op(
                    Op::EqEqual | Op::NotEqual | Op::Less | Op::LessEqual | Op::Greater | Op::GreaterEqual,
                )
                | TokenKind::Keyword(Keyword::In) => {
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Not) if self.peek_nth(1).is_keyword(Keyword::In) => {
                    self.bump();
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Is) => {
                    self.bump();
                    self.eat_kw(Keyword::Not);
                }
                _ => break,
            }
            compared = true;
            self.parse_bitwise_or()?;
        }
        Ok(if compared {
            Expr::Other(ExprKind::Comparison)
        } else {
            first
        })
    }

    pub(super) fn parse_bitwise_or(&mut self) -> PResult<Expr> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let prec = match self.peek().kind {
                TokenKind::Op(op) => binary_precedence(op),
                _ => None,
            };
            let Some(prec) = prec.filter(|p| *p >= min_prec) else {
                return Ok(lhs);
            };
            self.bump();
            self.nested(|p| p.parse_binary(prec + 1))?;
            lhs = Expr::Other(ExprKind::Operator);
        }
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        if matches!(self.peek().kind, TokenKind::Op(Op::Plus | Op::Minus | Op::Tilde)) {
            self.bump();
            self.nested(|p| p.parse_factor())?;
            return Ok(Expr::Other(ExprKind::Operator));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_await_primary()?;
        if self.eat_op(Op::DoubleStar) {
            self.nested(|p| p.parse_factor())?;
            return Ok(Expr::Other(ExprKind::Operator));
        }
        Ok(base)
    }

    fn parse_await_primary(&mut self) -> PResult<Expr> {
        if self.at_kw(Keyword::Await) {
            let tok = self.bump();
            self.check_await(&tok);
            self.parse_primary()?;
            return Ok(Expr::Other(ExprKind::Await));
        }
        self.parse_primary()
    }

    fn check_await(&mut self, tok: &Token) {
        match self.ctx.scope {
            Scope::Function { is_async: true } => {}
            Scope::Function { is_async: false } => self.defer(tok, "'await' outside async function"),
            Scope::Module | Scope::Class => self.defer(tok, "'await' outside function"),
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op(Op::Dot) {
                self.expect_name()?;
                expr = Expr::Attribute;
            } else if self.eat_op(Op::LParen) {
                self.parse_call_arguments()?;
                expr = Expr::Other(ExprKind::Call);
            } else if self.eat_op(Op::LBracket) {
                self.parse_slices()?;
                self.expect_op(Op::RBracket, "']'")?;
                expr = Expr::Subscript;
            } else {
                return Ok(expr);
            }
        }
    }

    // ═══════════════════════════════════════
    // ATOMS
    // ═══════════════════════════════════════

    fn parse_atom(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        let expr = match &tok.kind {
            TokenKind::Name(name) => {
                // Loads inside a comprehension belong to its own scope
                if !self.ctx.in_comprehension {
                    self.symbols.use_name(name);
                }
                Expr::Name(name.clone())
            }
            TokenKind::Number { .. } => Expr::Other(ExprKind::Literal),
            TokenKind::String { .. } => return self.parse_strings(),
            TokenKind::Keyword(Keyword::None) => Expr::Other(ExprKind::Constant("None")),
            TokenKind::Keyword(Keyword::True) => Expr::Other(ExprKind::Constant("True")),
            TokenKind::Keyword(Keyword::False) => Expr::Other(ExprKind::Constant("False")),
            TokenKind::Op(Op::Ellipsis) => Expr::Other(ExprKind::Ellipsis),
            TokenKind::Op(Op::LParen) => return self.parse_paren(),
            TokenKind::Op(Op::LBracket) => return self.parse_list_display(),
            TokenKind::Op(Op::LBrace) => return self.parse_brace_display(),
            _ => return Err(self.unexpected()),
        };
        self.bump();
        Ok(expr)
    }

    /// Adjacent string literals; bytes and text cannot be mixed
    pub(super) fn parse_strings(&mut self) -> PResult<Expr> {
        let first = self.peek().clone();
        let mut saw_bytes = false;
        let mut saw_text = false;
        while let TokenKind::String { bytes, fields, .. } = &self.peek().kind {
            if *bytes {
                saw_bytes = true;
            } else {
                saw_text = true;
            }
            let fields = fields.clone();
            let tok = self.bump();
            for field in &fields {
                self.parse_fstring_field(field, &tok)?;
            }
        }
        if saw_bytes && saw_text {
            return Err(Self::invalid_at(&first, "cannot mix bytes and nonbytes literals"));
        }
        Ok(Expr::Other(ExprKind::Literal))
    }

    fn parse_paren(&mut self) -> PResult<Expr> {
        self.bump();
        if self.eat_op(Op::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        if self.at_kw(Keyword::Yield) {
            self.parse_yield()?;
            self.expect_op(Op::RParen, "')'")?;
            return Ok(Expr::Other(ExprKind::Yield));
        }

        let start = self.peek().clone();
        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.at_comprehension_start() {
            self.reject_starred_element(&first, &start)?;
            self.parse_comprehension_clauses(mark)?;
            self.expect_op(Op::RParen, "')'")?;
            return Ok(Expr::Other(ExprKind::Comprehension));
        }
        if self.eat_op(Op::RParen) {
            if matches!(first, Expr::Starred(_)) {
                return Err(Self::invalid_at(&start, "cannot use starred expression here"));
            }
            return Ok(first);
        }

        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RParen) {
                break;
            }
            elts.push(self.parse_star_named_expression()?);
        }
        self.expect_op(Op::RParen, "')'")?;
        Ok(Expr::Tuple(elts))
    }

    fn parse_list_display(&mut self) -> PResult<Expr> {
        self.bump();
        if self.eat_op(Op::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }

        let start = self.peek().clone();
        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.at_comprehension_start() {
            self.reject_starred_element(&first, &start)?;
            self.parse_comprehension_clauses(mark)?;
            self.expect_op(Op::RBracket, "']'")?;
            return Ok(Expr::Other(ExprKind::Comprehension));
        }

        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBracket) {
                break;
            }
            elts.push(self.parse_star_named_expression()?);
        }
        self.expect_op(Op::RBracket, "']'")?;
        Ok(Expr::List(elts))
    }

    fn parse_brace_display(&mut self) -> PResult<Expr> {
        self.bump();
        if self.eat_op(Op::RBrace) {
            return Ok(Expr::Other(ExprKind::Dict));
        }
        if self.eat_op(Op::DoubleStar) {
            self.parse_bitwise_or()?;
            return self.parse_dict_rest();
        }

        let start = self.peek().clone();
        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.eat_op(Op::Colon) {
            if matches!(first, Expr::Starred(_)) {
                return Err(Self::invalid_at(
                    &start,
                    "cannot use a starred expression in a dictionary key",
                ));
            }
            self.parse_expression()?;
            if self.at_comprehension_start() {
                self.parse_comprehension_clauses(mark)?;
                self.expect_op(Op::RBrace, "'}'")?;
                return Ok(Expr::Other(ExprKind::Comprehension));
            }
            return self.parse_dict_rest();
        }

        if self.at_comprehension_start() {
            self.reject_starred_element(&first, &start)?;
            self.parse_comprehension_clauses(mark)?;
            self.expect_op(Op::RBrace, "'}'")?;
            return Ok(Expr::Other(ExprKind::Comprehension));
        }
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBrace) {
                break;
            }
            self.parse_star_named_expression()?;
        }
        self.expect_op(Op::RBrace, "'}'")?;
        Ok(Expr::Other(ExprKind::Set))
    }

    /// Remaining `key: value` and `**mapping` items after the first
    fn parse_dict_rest(&mut self) -> PResult<Expr> {
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBrace) {
                break;
            }
            if self.eat_op(Op::DoubleStar) {
                self.parse_bitwise_or()?;
                continue;
            }
            self.parse_expression()?;
            self.expect_op(Op::Colon, "':'")?;
            self.parse_expression()?;
        }
        self.expect_op(Op::RBrace, "'}'")?;
        Ok(Expr::Other(ExprKind::Dict))
    }

    fn reject_starred_element(&self, first: &Expr, start: &Token) -> PResult<()> {
        if matches!(first, Expr::Starred(_)) {
            return Err(Self::invalid_at(
                start,
                "iterable unpacking cannot be used in comprehension",
            ));
        }
        Ok(())
    }

    // ═══════════════════════════════════════
    // COMPREHENSIONS, LAMBDA, YIELD
    // ═══════════════════════════════════════

    fn at_comprehension_start(&self) -> bool {
        self.at_kw(Keyword::For)
            || (self.at_kw(Keyword::Async) && self.peek_nth(1).is_keyword(Keyword::For))
    }

    /// `for ... in ... if ...` clauses after the element parsed since `element`.
    /// The first iterable is evaluated in the enclosing scope; everything
    /// else runs in the comprehension's own.
    fn parse_comprehension_clauses(&mut self, element: Mark) -> PResult<()> {
        if let Some(tok) = self.symbols.yield_since(element).cloned() {
            self.defer(&tok, "'yield' inside comprehension");
        }
        self.symbols.forget_uses(element);

        let outer = self.ctx;
        let inner = Context {
            in_comprehension: true,
            ..outer
        };
        let mut iteration_names: Vec<String> = Vec::new();
        let mut first = true;

        while self.at_comprehension_start() {
            let target = self.with_context(inner, |p| {
                if p.at_kw(Keyword::Async) {
                    let tok = p.bump();
                    p.check_async(&tok, "asynchronous comprehension outside of an asynchronous function");
                }
                p.bump();
                let start = p.peek().clone();
                let target = p.parse_target_list()?;
                p.check_target(&target, &start, TargetKind::For)?;
                Ok(target)
            })?;
            iteration_names.extend(target.bound_names().into_iter().map(str::to_string));
            if !self.eat_kw(Keyword::In) {
                return Err(self.expected("'in'"));
            }

            let at = self.peek().clone();
            let iterable = self.symbols.mark();
            let ctx = if first { outer } else { inner };
            self.with_context(ctx, |p| p.parse_disjunction())?;
            if !self.symbols.named_since(iterable).is_empty() {
                self.defer(
                    &at,
                    "assignment expression cannot be used in a comprehension iterable expression",
                );
            }
            first = false;

            self.with_context(inner, |p| {
                while p.eat_kw(Keyword::If) {
                    p.parse_disjunction()?;
                }
                Ok(())
            })?;
        }

        let named = self.symbols.named_since(element);
        let rebound = named
            .iter()
            .find(|(name, _)| iteration_names.contains(name))
            .cloned();
        let in_class = named.first().filter(|_| self.symbols.in_class()).cloned();
        if let Some((name, tok)) = rebound {
            self.defer(
                &tok,
                format!(
                    "assignment expression cannot rebind comprehension iteration variable '{}'",
                    name
                ),
            );
        } else if let Some((_, tok)) = in_class {
            self.defer(
                &tok,
                "assignment expression within a comprehension cannot be used in a class body",
            );
        }
        Ok(())
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        self.bump();
        let params = self.parse_parameters(ParamStyle::Lambda)?;
        self.expect_op(Op::Colon, "':'")?;

        self.symbols.enter(BlockKind::Function);
        for param in &params {
            self.symbols.param(param);
        }
        let body = self.with_context(Context::function(false), |p| p.parse_expression());
        self.symbols.exit();
        body?;
        Ok(Expr::Other(ExprKind::Lambda))
    }

    pub(super) fn parse_yield(&mut self) -> PResult<Expr> {
        let tok = self.bump();
        self.symbols.yielded(&tok);
        if self.ctx.in_comprehension {
            self.defer(&tok, "'yield' inside comprehension");
        } else if !matches!(self.ctx.scope, Scope::Function { .. }) {
            self.defer(&tok, "'yield' outside function");
        }
        if self.eat_kw(Keyword::From) {
            self.parse_expression()?;
        } else if self.starts_expression() {
            self.parse_star_expressions()?;
        }
        Ok(Expr::Other(ExprKind::Yield))
    }

    // ═══════════════════════════════════════
    // CALLS AND SUBSCRIPTS
    // ═══════════════════════════════════════

    /// Arguments after an opening `(`, through the closing `)`
    pub(super) fn parse_call_arguments(&mut self) -> PResult<()> {
        let mut seen_keyword = false;
        let mut seen_double_star = false;
        let mut count = 0;
        let mut bare_genexp = false;
        let mut trailing_comma = false;
        let mut keywords: Vec<String> = Vec::new();

        loop {
            if self.eat_op(Op::RParen) {
                break;
            }
            trailing_comma = false;
            let tok = self.peek().clone();

            if self.eat_op(Op::Star) {
                if seen_double_star {
                    return Err(Self::invalid_at(
                        &tok,
                        "iterable argument unpacking follows keyword argument unpacking",
                    ));
                }
                self.parse_expression()?;
            } else if self.eat_op(Op::DoubleStar) {
                self.parse_expression()?;
                seen_double_star = true;
            } else if matches!(tok.kind, TokenKind::Name(_)) && self.peek_nth(1).is_op(Op::Equal) {
                if let TokenKind::Name(name) = &tok.kind {
                    if name == "__debug__" {
                        self.defer(&tok, "cannot assign to __debug__");
                    } else if keywords.contains(name) {
                        self.defer(&tok, format!("keyword argument repeated: {}", name));
                    }
                    keywords.push(name.clone());
                }
                self.bump();
                self.bump();
                self.parse_expression()?;
                seen_keyword = true;
            } else {
                let mark = self.symbols.mark();
                self.parse_named_expression()?;
                if self.at_op(Op::Equal) {
                    return Err(Self::invalid_at(
                        &tok,
                        "expression cannot contain assignment, perhaps you meant \"==\"?",
                    ));
                }
                if self.at_comprehension_start() {
                    self.parse_comprehension_clauses(mark)?;
                    bare_genexp = true;
                }
                if seen_double_star {
                    return Err(Self::invalid_at(
                        &tok,
                        "positional argument follows keyword argument unpacking",
                    ));
                }
                if seen_keyword {
                    return Err(Self::invalid_at(&tok, "positional argument follows keyword argument"));
                }
            }

            count += 1;
            if !self.eat_op(Op::Comma) {
                self.expect_op(Op::RParen, "')'")?;
                break;
            }
            trailing_comma = true;
        }

        if bare_genexp && (count > 1 || trailing_comma) {
            return Err(self.invalid_here("Generator expression must be parenthesized"));
        }
        Ok(())
    }

    fn parse_slices(&mut self) -> PResult<()> {
        loop {
            self.parse_slice()?;
            if !self.eat_op(Op::Comma) || self.at_op(Op::RBracket) {
                return Ok(());
            }
        }
    }

    fn parse_slice(&mut self) -> PResult<()> {
        if self.eat_op(Op::Star) {
            self.parse_bitwise_or()?;
            return Ok(());
        }
        if !self.at_op(Op::Colon) {
            self.parse_named_expression()?;
            if !self.at_op(Op::Colon) {
                return Ok(());
            }
        }
        self.bump();
        let bound_ends = |p: &Self| p.at_op(Op::Colon) || p.at_op(Op::Comma) || p.at_op(Op::RBracket);
        if !bound_ends(self) {
            self.parse_expression()?;
        }
        if self.eat_op(Op::Colon) && !bound_ends(self) {
            self.parse_expression()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Failure;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    fn parse(source: &str) -> Result<(), super::super::Failure> {
        Parser::new(Lexer::new(source).tokenize()).parse_interactive()
    }

    fn ok(source: &str) -> bool {
        parse(source).is_ok()
    }

    fn invalid(source: &str) -> bool {
        matches!(parse(source), Err(Failure::Invalid { .. }))
    }

    #[test]
    fn test_operator_chains() {
        assert!(ok("x = a + b * c ** -d // e % f @ g"));
        assert!(ok("x = a | b ^ c & d << e >> f"));
        assert!(ok("x = not a and b or c"));
        assert!(ok("x = a < b <= c != d is not e not in f"));
        assert!(ok("x = a if b else c if d else e"));
        assert!(invalid("x = a if b"));
        assert!(invalid("x = a +"));
        assert!(invalid("x = = 1"));
    }

    #[test]
    fn test_displays() {
        assert!(ok("x = (1, 2, *rest)"));
        assert!(ok("x = [1, *a, 2,]"));
        assert!(ok("x = {1, 2}"));
        assert!(ok("x = {'a': 1, **other}"));
        assert!(ok("x = ()"));
        assert!(ok("x = {}"));
        assert!(invalid("x = {*a: 1}"));
    }

    #[test]
    fn test_comprehensions() {
        assert!(ok("x = [i * 2 for i in range(10) if i % 2 for j in k]"));
        assert!(ok("x = {k: v for k, v in items}"));
        assert!(ok("x = {v for v in s}"));
        assert!(ok("x = sum(i for i in xs)"));
        assert!(invalid("x = [*a for a in b]"));
        assert!(invalid("x = f(i for i in xs, 1)"));
    }

    #[test]
    fn test_calls() {
        assert!(ok("f(a, b=1, *c, d=2, **e)"));
        assert!(invalid("f(a=1, b)"));
        assert!(invalid("f(**k, a)"));
        assert!(invalid("f(**k, *a)"));
        assert!(invalid("f(a.b=1)"));
    }

    #[test]
    fn test_subscripts_and_slices() {
        assert!(ok("x = a[1:2, ::3, :, *b]"));
        assert!(ok("x = a[i][j].k(l)[m:]"));
        assert!(invalid("x = a[]"));
    }

    #[test]
    fn test_walrus() {
        assert!(ok("if (n := len(a)) > 10: pass"));
        assert!(ok("print(y := 5)"));
        assert!(invalid("x = (a.b := 1)"));
    }

    #[test]
    fn test_lambda_and_yield() {
        assert!(ok("f = lambda: 0"));
        assert!(ok("def g():\n    x = yield from y"));
        assert!(ok("def g():\n    yield a, b"));
        assert!(ok("def g():\n    return (yield)"));
    }

    #[test]
    fn test_string_concatenation() {
        assert!(ok("x = 'a' 'b' f'{c}'"));
        assert!(invalid("x = b'a' 'b'"));
    }

    #[test]
    fn test_keyword_arguments() {
        assert!(ok("f(a=1, b=2)"));
        assert!(invalid("f(a=1, a=2)"));
        assert!(invalid("f(x, __debug__=1)"));
        assert!(invalid("f(x for x in y,)"));
        assert!(ok("f(x for x in y)"));
    }

    #[test]
    fn test_walrus_in_comprehensions() {
        assert!(ok("x = [y := f(i) for i in a]"));
        assert!(invalid("x = [i := 0 for i in a]"));
        assert!(invalid("x = [[(j := 0) for k in b] for j in a]"));
        assert!(invalid("x = [i for i in (y := a)]"));
        assert!(invalid("x = [i for i in a for j in (y := b)]"));
        assert!(invalid("class A:\n    x = [y := i for i in a]"));
        assert!(ok("class A:\n    x = (y := 1)"));
    }

    #[test]
    fn test_yield_in_comprehension_element() {
        assert!(invalid("def f():\n    return [(yield) for x in y]"));
        assert!(invalid("def f():\n    return {k: (yield) for k in y}"));
        assert!(ok("def f():\n    return [x for x in (yield)]"));
        assert!(ok("def f():\n    return [lambda: x for x in y]"));
    }

    #[test]
    fn test_await_in_async_comprehension() {
        assert!(ok("async def f():\n    return [await x async for x in y]"));
        assert!(invalid("def f():\n    return [x async for x in y]"));
    }
}
