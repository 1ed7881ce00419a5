// src/syntax/parser/mod.rs
// Recursive-descent parser for one interactive Python statement
//
// The parser only decides whether the token stream forms exactly one valid
// statement. It builds no tree beyond the small `Expr` summary needed to
// check assignment targets.

mod expr;
mod pattern;
mod symbols;
mod target;

pub(crate) use target::Expr;

use std::cell::Cell;

use super::lexer::Lexer;
use super::token::{Keyword, Op, Token, TokenKind};
use symbols::{BlockKind, Mark, SymbolTable};
use target::TargetKind;

/// Maximum nesting depth before parsing gives up (CPython's parser stack
/// limit). Callers must run the parser on a stack sized for it.
pub const MAX_DEPTH: usize = 6000;

/// Features `from __future__ import` accepts
const FUTURE_FEATURES: &[&str] = &[
    "nested_scopes",
    "generators",
    "division",
    "absolute_import",
    "with_statement",
    "print_function",
    "unicode_literals",
    "barry_as_FLUFL",
    "generator_stop",
    "annotations",
];

/// Why a parse stopped
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Failure {
    /// More input could still make the statement valid
    Incomplete,
    Invalid {
        message: String,
        line: usize,
        column: usize,
    },
    /// Recursion budget exhausted
    TooComplex,
}

pub(crate) type PResult<T> = Result<T, Failure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    Function { is_async: bool },
    Class,
}

#[derive(Debug, Clone, Copy)]
struct Context {
    scope: Scope,
    in_loop: bool,
    in_comprehension: bool,
}

impl Context {
    fn module() -> Self {
        Self {
            scope: Scope::Module,
            in_loop: false,
            in_comprehension: false,
        }
    }

    fn function(is_async: bool) -> Self {
        Self {
            scope: Scope::Function { is_async },
            in_loop: false,
            in_comprehension: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamStyle {
    Def,
    Lambda,
}

/// What a simple statement was, as far as `__future__` placement goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Small {
    FutureImport,
    Docstring,
    Other,
}

/// Parser state to return to after a failed attempt
struct Checkpoint {
    idx: usize,
    deferred: Option<Failure>,
    symbols: SymbolTable,
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    depth: usize,
    ctx: Context,
    /// First compile-stage error. Reported only if the statement parses.
    deferred: Option<Failure>,
    symbols: SymbolTable,
    fstring_depth: usize,
    /// Still inside the docstring and `__future__` imports that may open a file
    future_ok: bool,
    seen_statement: bool,
    /// Furthest token index ever looked at
    furthest: Cell<usize>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            idx: 0,
            depth: 0,
            ctx: Context::module(),
            deferred: None,
            symbols: SymbolTable::new(),
            fstring_depth: 0,
            future_ok: true,
            seen_statement: false,
            furthest: Cell::new(0),
        }
    }

    /// Parse exactly one statement followed by end of input
    pub fn parse_interactive(&mut self) -> PResult<()> {
        match self.parse_single() {
            // Reading ahead already ran into the open end of input
            Err(Failure::Invalid { .. })
                if self
                    .tokens
                    .get(self.furthest.get())
                    .is_some_and(|t| t.kind == TokenKind::Incomplete) =>
            {
                Err(Failure::Incomplete)
            }
            other => other,
        }
    }

    fn parse_single(&mut self) -> PResult<()> {
        match &self.peek().kind {
            TokenKind::Indent => return Err(self.invalid_here("unexpected indent")),
            TokenKind::EndMarker { .. } => return Err(Failure::Incomplete),
            _ => {}
        }

        self.parse_statement()?;

        match &self.peek().kind {
            TokenKind::EndMarker { .. } => {}
            TokenKind::Incomplete | TokenKind::Error(_) => return Err(self.unexpected()),
            _ => {
                return Err(self.invalid_here(
                    "multiple statements found while compiling a single statement",
                ));
            }
        }

        if let Some((name, at)) = self.symbols.unresolved().cloned() {
            self.defer(&at, format!("no binding for nonlocal '{}' found", name));
        }
        if let Some(failure) = self.deferred.take() {
            return Err(failure);
        }
        // Input stopped right after a line join, so the next line belongs
        // to this statement
        if self.peek().kind == (TokenKind::EndMarker { joined: true }) {
            return Err(Failure::Incomplete);
        }
        Ok(())
    }

    // ═══════════════════════════════════════
    // TOKEN CURSOR
    // ═══════════════════════════════════════

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// Look ahead without crossing the terminal token
    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        let mut i = self.idx;
        for _ in 0..n {
            if i >= last || self.tokens[i].is_terminal() {
                break;
            }
            i += 1;
        }
        let i = i.min(last);
        if i > self.furthest.get() {
            self.furthest.set(i);
        }
        &self.tokens[i]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if !tok.is_terminal() {
            self.idx += 1;
        }
        tok
    }

    fn at_op(&self, op: Op) -> bool {
        self.peek().is_op(op)
    }

    fn at_kw(&self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    fn at_newline(&self) -> bool {
        self.peek().kind == TokenKind::Newline
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Op, what: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn expect_newline(&mut self) -> PResult<()> {
        if self.at_newline() {
            self.bump();
            Ok(())
        } else {
            Err(self.expected("newline"))
        }
    }

    /// Identifier, including soft keywords
    fn expect_name(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Name(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.expected("a name")),
        }
    }

    // ═══════════════════════════════════════
    // FAILURES
    // ═══════════════════════════════════════

    fn invalid_at(tok: &Token, message: impl Into<String>) -> Failure {
        Failure::Invalid {
            message: message.into(),
            line: tok.line,
            column: tok.column,
        }
    }

    fn invalid_here(&self, message: impl Into<String>) -> Failure {
        Self::invalid_at(self.peek(), message)
    }

    /// Failure for whatever token is under the cursor
    fn unexpected(&self) -> Failure {
        let tok = self.peek();
        match &tok.kind {
            TokenKind::Incomplete => Failure::Incomplete,
            TokenKind::Error(message) => Self::invalid_at(tok, message.clone()),
            TokenKind::EndMarker { .. } => Failure::Incomplete,
            _ => Self::invalid_at(tok, "invalid syntax"),
        }
    }

    fn expected(&self, what: &str) -> Failure {
        match &self.peek().kind {
            TokenKind::Incomplete | TokenKind::Error(_) | TokenKind::EndMarker { .. } => {
                self.unexpected()
            }
            _ => self.invalid_here(format!("expected {}", what)),
        }
    }

    /// Failure for a construct that still needs more lines. Incomplete if
    /// only dedents remain before the end of input.
    fn awaiting_more(&self, message: &str) -> Failure {
        let mut i = self.idx;
        while self.tokens.get(i).is_some_and(|t| t.kind == TokenKind::Dedent) {
            i += 1;
        }
        match self.tokens.get(i).map(|t| &t.kind) {
            Some(TokenKind::EndMarker { .. } | TokenKind::Incomplete) => Failure::Incomplete,
            Some(TokenKind::Error(_)) if i == self.idx => self.unexpected(),
            _ => self.invalid_here(message),
        }
    }

    /// Record a compile-stage error; the first one wins
    fn defer(&mut self, tok: &Token, message: impl Into<String>) {
        if self.deferred.is_none() {
            self.deferred = Some(Self::invalid_at(tok, message));
        }
    }

    // ═══════════════════════════════════════
    // NESTING AND CONTEXT
    // ═══════════════════════════════════════

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(Failure::TooComplex);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn with_context<T>(&mut self, ctx: Context, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.ctx;
        self.ctx = ctx;
        let result = f(self);
        self.ctx = saved;
        result
    }

    /// Run `f` and rewind if it fails with a syntax error. Returns None
    /// after rewinding.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<Option<T>> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Ok(Some(value)),
            Err(Failure::Invalid { .. }) => {
                self.rewind(checkpoint);
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            idx: self.idx,
            deferred: self.deferred.clone(),
            symbols: self.symbols.clone(),
        }
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.idx = checkpoint.idx;
        self.deferred = checkpoint.deferred;
        self.symbols = checkpoint.symbols;
    }

    /// Record `target`'s names as bound; it was parsed after `since`
    fn bind_target(&mut self, target: &Expr, since: Mark) {
        for name in target.bound_names() {
            self.symbols.store(name, since);
        }
    }

    fn reject_starred_value(&mut self, value: &Expr, at: &Token) {
        if matches!(value, Expr::Starred(_)) {
            self.defer(at, "can't use starred expression here");
        }
    }

    // ═══════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════

    fn parse_statement(&mut self) -> PResult<()> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> PResult<()> {
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::With) => self.parse_with(),
            TokenKind::Keyword(Keyword::Def) => self.parse_funcdef(false),
            TokenKind::Keyword(Keyword::Class) => self.parse_classdef(),
            TokenKind::Keyword(Keyword::Async) => self.parse_async(),
            TokenKind::Op(Op::At) => self.parse_decorated(),
            TokenKind::Indent => Err(self.invalid_here("unexpected indent")),
            TokenKind::Name(name) if name == "match" => {
                if self.parse_match()? {
                    Ok(())
                } else {
                    self.parse_simple_statements()
                }
            }
            _ => self.parse_simple_statements(),
        }
    }

    /// `':' suite`
    fn parse_block(&mut self) -> PResult<()> {
        self.expect_op(Op::Colon, "':'")?;
        self.future_ok = false;
        self.parse_suite()
    }

    fn parse_suite(&mut self) -> PResult<()> {
        if !self.at_newline() {
            return self.parse_simple_statements();
        }
        self.bump();
        self.expect_indent()?;
        loop {
            self.parse_statement()?;
            if self.peek().kind == TokenKind::Dedent {
                self.bump();
                return Ok(());
            }
        }
    }

    fn expect_indent(&mut self) -> PResult<()> {
        if self.peek().kind == TokenKind::Indent {
            self.bump();
            Ok(())
        } else {
            Err(self.awaiting_more("expected an indented block"))
        }
    }

    fn parse_loop_body(&mut self) -> PResult<()> {
        let ctx = Context {
            in_loop: true,
            ..self.ctx
        };
        self.with_context(ctx, |p| p.parse_block())
    }

    fn parse_if(&mut self) -> PResult<()> {
        self.bump();
        self.parse_named_expression()?;
        self.parse_block()?;
        loop {
            if self.eat_kw(Keyword::Elif) {
                self.parse_named_expression()?;
                self.parse_block()?;
                continue;
            }
            if self.eat_kw(Keyword::Else) {
                self.parse_block()?;
            }
            return Ok(());
        }
    }

    fn parse_while(&mut self) -> PResult<()> {
        self.bump();
        self.parse_named_expression()?;
        self.parse_loop_body()?;
        if self.eat_kw(Keyword::Else) {
            self.parse_block()?;
        }
        Ok(())
    }

    fn parse_for(&mut self) -> PResult<()> {
        self.bump();
        let start = self.peek().clone();
        let mark = self.symbols.mark();
        let target = self.parse_target_list()?;
        self.check_target(&target, &start, TargetKind::For)?;
        self.bind_target(&target, mark);
        if !self.eat_kw(Keyword::In) {
            return Err(self.expected("'in'"));
        }
        let at = self.peek().clone();
        let iterable = self.parse_star_expressions()?;
        self.reject_starred_value(&iterable, &at);
        self.parse_loop_body()?;
        if self.eat_kw(Keyword::Else) {
            self.parse_block()?;
        }
        Ok(())
    }

    fn parse_try(&mut self) -> PResult<()> {
        self.bump();
        self.parse_block()?;

        let mut handlers = 0;
        let mut star_form: Option<bool> = None;
        let mut bare_seen = false;
        while self.at_kw(Keyword::Except) {
            let tok = self.bump();
            if bare_seen {
                return Err(Self::invalid_at(&tok, "default 'except:' must be last"));
            }
            let is_star = self.eat_op(Op::Star);
            match star_form {
                Some(prev) if prev != is_star => {
                    return Err(Self::invalid_at(
                        &tok,
                        "cannot have both 'except' and 'except*' on the same 'try'",
                    ));
                }
                _ => star_form = Some(is_star),
            }

            if self.at_op(Op::Colon) {
                if is_star {
                    return Err(self.invalid_here("expected one or more exception types"));
                }
                bare_seen = true;
            } else {
                self.parse_expression()?;
                if self.at_op(Op::Comma) {
                    return Err(self.invalid_here("multiple exception types must be parenthesized"));
                }
                if self.eat_kw(Keyword::As) {
                    let name = self.expect_name()?;
                    self.symbols.bind(&name);
                }
            }
            self.parse_block()?;
            handlers += 1;
        }

        if self.at_kw(Keyword::Else) {
            if handlers == 0 {
                return Err(self.invalid_here("expected 'except' or 'finally' block"));
            }
            self.bump();
            self.parse_block()?;
        }
        if self.eat_kw(Keyword::Finally) {
            return self.parse_block();
        }
        if handlers == 0 {
            return Err(self.awaiting_more("expected 'except' or 'finally' block"));
        }
        Ok(())
    }

    fn parse_with(&mut self) -> PResult<()> {
        self.bump();
        if self.at_op(Op::LParen) {
            let checkpoint = self.checkpoint();
            let parsed = self.attempt(|p| p.parse_parenthesized_with_items())?;
            if parsed.is_some() && self.at_op(Op::Colon) {
                return self.parse_block();
            }
            self.rewind(checkpoint);
        }
        loop {
            self.parse_with_item()?;
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.parse_block()
    }

    fn parse_parenthesized_with_items(&mut self) -> PResult<()> {
        self.bump();
        loop {
            self.parse_with_item()?;
            if !self.eat_op(Op::Comma) || self.at_op(Op::RParen) {
                break;
            }
        }
        self.expect_op(Op::RParen, "')'")
    }

    fn parse_with_item(&mut self) -> PResult<()> {
        self.parse_expression()?;
        if self.eat_kw(Keyword::As) {
            let start = self.peek().clone();
            let mark = self.symbols.mark();
            let target = self.parse_target_element()?;
            self.check_target(&target, &start, TargetKind::With)?;
            self.bind_target(&target, mark);
        }
        Ok(())
    }

    fn parse_funcdef(&mut self, is_async: bool) -> PResult<()> {
        self.bump();
        let name = self.expect_name()?;
        self.symbols.bind(&name);
        if self.at_op(Op::LBracket) {
            self.parse_type_params()?;
        }
        self.expect_op(Op::LParen, "'('")?;
        let params = self.parse_parameters(ParamStyle::Def)?;
        self.expect_op(Op::RParen, "')'")?;
        if self.eat_op(Op::Arrow) {
            self.parse_expression()?;
        }

        self.symbols.enter(BlockKind::Function);
        for param in &params {
            self.symbols.param(param);
        }
        let body = self.with_context(Context::function(is_async), |p| p.parse_block());
        self.symbols.exit();
        body
    }

    fn parse_classdef(&mut self) -> PResult<()> {
        self.bump();
        let name = self.expect_name()?;
        self.symbols.bind(&name);
        if self.at_op(Op::LBracket) {
            self.parse_type_params()?;
        }
        if self.eat_op(Op::LParen) {
            self.parse_call_arguments()?;
        }
        let ctx = Context {
            scope: Scope::Class,
            in_loop: false,
            in_comprehension: false,
        };
        self.symbols.enter(BlockKind::Class);
        let body = self.with_context(ctx, |p| p.parse_block());
        self.symbols.exit();
        body
    }

    fn parse_async(&mut self) -> PResult<()> {
        let tok = self.bump();
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::Def) => self.parse_funcdef(true),
            TokenKind::Keyword(Keyword::For) => {
                self.check_async(&tok, "'async for' outside async function");
                self.parse_for()
            }
            TokenKind::Keyword(Keyword::With) => {
                self.check_async(&tok, "'async with' outside async function");
                self.parse_with()
            }
            _ => Err(self.expected("'def', 'for' or 'with' after 'async'")),
        }
    }

    fn check_async(&mut self, tok: &Token, message: &str) {
        if self.ctx.scope != (Scope::Function { is_async: true }) {
            self.defer(tok, message);
        }
    }

    fn parse_decorated(&mut self) -> PResult<()> {
        while self.eat_op(Op::At) {
            self.parse_named_expression()?;
            self.expect_newline()?;
        }
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::Def) => self.parse_funcdef(false),
            TokenKind::Keyword(Keyword::Class) => self.parse_classdef(),
            TokenKind::Keyword(Keyword::Async) if self.peek_nth(1).is_keyword(Keyword::Def) => {
                self.bump();
                self.parse_funcdef(true)
            }
            _ => Err(self.awaiting_more("expected a function or class definition after decorator")),
        }
    }

    fn parse_type_params(&mut self) -> PResult<()> {
        self.bump();
        if self.at_op(Op::RBracket) {
            return Err(self.invalid_here("Type parameter list cannot be empty"));
        }
        loop {
            if self.eat_op(Op::Star) || self.eat_op(Op::DoubleStar) {
                self.expect_name()?;
            } else {
                self.expect_name()?;
                if self.eat_op(Op::Colon) {
                    self.parse_expression()?;
                }
            }
            if self.eat_op(Op::Equal) {
                self.parse_star_expression()?;
            }
            if !self.eat_op(Op::Comma) || self.at_op(Op::RBracket) {
                break;
            }
        }
        self.expect_op(Op::RBracket, "']'")
    }

    /// Parameter list of a `def` (up to `)`) or a `lambda` (up to `:`).
    /// Returns the parameter names.
    fn parse_parameters(&mut self, style: ParamStyle) -> PResult<Vec<String>> {
        let closer = match style {
            ParamStyle::Def => Op::RParen,
            ParamStyle::Lambda => Op::Colon,
        };

        let mut names: Vec<(String, Token)> = Vec::new();
        let mut positional = 0;
        let mut keyword_only = 0;
        let mut seen_default = false;
        let mut seen_slash = false;
        let mut bare_star: Option<Token> = None;
        let mut seen_star = false;
        let mut seen_kwargs = false;

        while !self.at_op(closer) {
            let tok = self.peek().clone();
            if seen_kwargs {
                return Err(Self::invalid_at(&tok, "arguments cannot follow var-keyword argument"));
            }

            if self.eat_op(Op::Slash) {
                if seen_slash {
                    return Err(Self::invalid_at(&tok, "/ may appear only once"));
                }
                if seen_star {
                    return Err(Self::invalid_at(&tok, "/ must be ahead of *"));
                }
                if positional == 0 {
                    return Err(Self::invalid_at(&tok, "at least one argument must precede /"));
                }
                seen_slash = true;
            } else if self.eat_op(Op::Star) {
                if seen_star {
                    return Err(Self::invalid_at(&tok, "* argument may appear only once"));
                }
                seen_star = true;
                if matches!(self.peek().kind, TokenKind::Name(_)) {
                    let name_tok = self.peek().clone();
                    let name = self.parse_param_name(style, true)?;
                    names.push((name, name_tok));
                } else {
                    bare_star = Some(tok);
                }
            } else if self.eat_op(Op::DoubleStar) {
                let name_tok = self.peek().clone();
                let name = self.parse_param_name(style, false)?;
                names.push((name, name_tok));
                if self.at_op(Op::Equal) {
                    return Err(self.invalid_here("var-keyword argument cannot have default value"));
                }
                seen_kwargs = true;
            } else {
                let name = self.parse_param_name(style, false)?;
                names.push((name, tok.clone()));
                let has_default = if self.eat_op(Op::Equal) {
                    self.parse_expression()?;
                    true
                } else {
                    false
                };
                if seen_star {
                    keyword_only += 1;
                } else {
                    positional += 1;
                    if has_default {
                        seen_default = true;
                    } else if seen_default {
                        return Err(Self::invalid_at(
                            &tok,
                            "parameter without a default follows parameter with a default",
                        ));
                    }
                }
            }

            if !self.eat_op(Op::Comma) {
                break;
            }
        }

        if let Some(tok) = bare_star {
            if keyword_only == 0 {
                return Err(Self::invalid_at(&tok, "named arguments must follow bare *"));
            }
        }

        for (i, (name, tok)) in names.iter().enumerate() {
            if names[..i].iter().any(|(earlier, _)| earlier == name) {
                self.defer(tok, format!("duplicate argument '{}' in function definition", name));
                break;
            }
        }
        Ok(names.into_iter().map(|(name, _)| name).collect())
    }

    fn parse_param_name(&mut self, style: ParamStyle, star_annotation: bool) -> PResult<String> {
        let name = self.expect_name()?;
        if style == ParamStyle::Def && self.eat_op(Op::Colon) {
            if star_annotation {
                self.parse_star_expression()?;
            } else {
                self.parse_expression()?;
            }
        }
        Ok(name)
    }

    // ═══════════════════════════════════════
    // SIMPLE STATEMENTS
    // ═══════════════════════════════════════

    fn parse_simple_statements(&mut self) -> PResult<()> {
        loop {
            let small = self.parse_small_statement()?;
            let keeps_prelude = match small {
                Small::FutureImport => true,
                Small::Docstring => !self.seen_statement,
                Small::Other => false,
            };
            self.future_ok &= keeps_prelude;
            self.seen_statement = true;
            if !self.eat_op(Op::Semi) || self.at_newline() {
                break;
            }
        }
        if self.at_newline() {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Op(Op::Semi) | TokenKind::EndMarker { .. }
        )
    }

    fn parse_small_statement(&mut self) -> PResult<Small> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Keyword(Keyword::Pass) => {
                self.bump();
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                if !self.ctx.in_loop {
                    self.defer(&tok, "'break' outside loop");
                }
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                if !self.ctx.in_loop {
                    self.defer(&tok, "'continue' not properly in loop");
                }
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                if !matches!(self.ctx.scope, Scope::Function { .. }) {
                    self.defer(&tok, "'return' outside function");
                }
                if !self.at_statement_end() {
                    let at = self.peek().clone();
                    let value = self.parse_star_expressions()?;
                    self.reject_starred_value(&value, &at);
                }
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.bump();
                if !self.at_statement_end() {
                    self.parse_expression()?;
                    if self.eat_kw(Keyword::From) {
                        self.parse_expression()?;
                    }
                }
            }
            TokenKind::Keyword(Keyword::Global) => {
                self.bump();
                for (name, at) in self.parse_name_list()? {
                    if let Err(message) = self.symbols.declare_global(&name) {
                        self.defer(&at, message);
                    }
                }
            }
            TokenKind::Keyword(Keyword::Nonlocal) => {
                self.bump();
                let at_module = self.ctx.scope == Scope::Module;
                if at_module {
                    self.defer(&tok, "nonlocal declaration not allowed at module level");
                }
                for (name, at) in self.parse_name_list()? {
                    if at_module {
                        continue;
                    }
                    if let Err(message) = self.symbols.declare_nonlocal(&name, &at) {
                        self.defer(&at, message);
                    }
                }
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.bump();
                let start = self.peek().clone();
                let mark = self.symbols.mark();
                let targets = self.parse_star_expressions()?;
                self.check_target(&targets, &start, TargetKind::Del)?;
                self.bind_target(&targets, mark);
            }
            TokenKind::Keyword(Keyword::Assert) => {
                self.bump();
                self.parse_expression()?;
                if self.eat_op(Op::Comma) {
                    self.parse_expression()?;
                }
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import()?,
            TokenKind::Keyword(Keyword::From) => return self.parse_from_import(),
            TokenKind::Name(name)
                if name == "type"
                    && matches!(self.peek_nth(1).kind, TokenKind::Name(_))
                    && (self.peek_nth(2).is_op(Op::Equal) || self.peek_nth(2).is_op(Op::LBracket)) =>
            {
                self.parse_type_alias()?
            }
            _ => {
                let start = self.idx;
                self.parse_expression_statement()?;
                let docstring = self.tokens[start..self.idx].iter().all(|t| {
                    matches!(
                        t.kind,
                        TokenKind::String {
                            bytes: false,
                            formatted: false,
                            ..
                        }
                    )
                });
                if docstring {
                    return Ok(Small::Docstring);
                }
            }
        }
        Ok(Small::Other)
    }

    fn parse_name_list(&mut self) -> PResult<Vec<(String, Token)>> {
        let mut names = Vec::new();
        loop {
            let tok = self.peek().clone();
            names.push((self.expect_name()?, tok));
            if !self.eat_op(Op::Comma) {
                return Ok(names);
            }
        }
    }

    /// `a.b.c`, returned joined with dots
    fn parse_dotted_name(&mut self) -> PResult<String> {
        let mut dotted = self.expect_name()?;
        while self.eat_op(Op::Dot) {
            dotted.push('.');
            dotted.push_str(&self.expect_name()?);
        }
        Ok(dotted)
    }

    fn parse_import(&mut self) -> PResult<()> {
        self.bump();
        loop {
            let dotted = self.parse_dotted_name()?;
            if self.eat_kw(Keyword::As) {
                let alias = self.expect_name()?;
                self.symbols.bind(&alias);
            } else {
                let top = dotted.split('.').next().unwrap_or(dotted.as_str());
                self.symbols.bind(top);
            }
            if !self.eat_op(Op::Comma) {
                return Ok(());
            }
        }
    }

    fn parse_from_import(&mut self) -> PResult<Small> {
        let from = self.bump();
        let mut dots = 0;
        while self.eat_op(Op::Dot) || self.eat_op(Op::Ellipsis) {
            dots += 1;
        }
        let mut module = String::new();
        if dots == 0 || !self.at_kw(Keyword::Import) {
            module = self.parse_dotted_name()?;
        }
        if !self.eat_kw(Keyword::Import) {
            return Err(self.expected("'import'"));
        }

        let future = dots == 0 && module == "__future__";
        if future && !self.future_ok {
            self.defer(&from, "from __future__ imports must occur at the beginning of the file");
        }
        let small = if future { Small::FutureImport } else { Small::Other };

        let star = self.peek().clone();
        if self.eat_op(Op::Star) {
            if future {
                self.defer(&star, "future feature * is not defined");
            }
            if self.ctx.scope != Scope::Module {
                self.defer(&star, "import * only allowed at module level");
            }
            return Ok(small);
        }

        let parenthesized = self.eat_op(Op::LParen);
        loop {
            let tok = self.peek().clone();
            let name = self.expect_name()?;
            if future {
                self.check_future_feature(&name, &tok);
            }
            if self.eat_kw(Keyword::As) {
                let alias = self.expect_name()?;
                self.symbols.bind(&alias);
            } else {
                self.symbols.bind(&name);
            }
            if !self.at_op(Op::Comma) {
                break;
            }
            self.bump();
            if parenthesized && self.at_op(Op::RParen) {
                break;
            }
            if !parenthesized && self.at_statement_end() {
                return Err(self.invalid_here("trailing comma not allowed without surrounding parentheses"));
            }
        }
        if parenthesized {
            self.expect_op(Op::RParen, "')'")?;
        }
        Ok(small)
    }

    fn check_future_feature(&mut self, name: &str, at: &Token) {
        if name == "braces" {
            self.defer(at, "not a chance");
        } else if !FUTURE_FEATURES.contains(&name) {
            self.defer(at, format!("future feature {} is not defined", name));
        }
    }

    fn parse_type_alias(&mut self) -> PResult<()> {
        self.bump();
        let name = self.expect_name()?;
        self.symbols.bind(&name);
        if self.at_op(Op::LBracket) {
            self.parse_type_params()?;
        }
        self.expect_op(Op::Equal, "'='")?;
        self.parse_expression()?;
        Ok(())
    }

    fn parse_expression_statement(&mut self) -> PResult<()> {
        let start = self.peek().clone();
        let mark = self.symbols.mark();
        let first = self.parse_star_expressions_or_yield()?;
        let tok = self.peek().clone();

        match &tok.kind {
            TokenKind::Op(Op::Colon) => {
                self.check_annotation_target(&first, &start)?;
                self.bump();
                self.parse_expression()?;
                if let Expr::Name(name) = &first {
                    if let Err(message) = self.symbols.annotate(name, mark) {
                        self.defer(&start, message);
                    }
                }
                if self.eat_op(Op::Equal) {
                    let at = self.peek().clone();
                    let value = self.parse_star_expressions_or_yield()?;
                    self.reject_starred_value(&value, &at);
                }
            }
            TokenKind::Op(op) if op.is_augassign() => {
                self.check_augassign_target(&first, &start)?;
                self.bump();
                let at = self.peek().clone();
                let value = self.parse_star_expressions_or_yield()?;
                self.reject_starred_value(&value, &at);
                if let Expr::Name(name) = &first {
                    self.symbols.bind(name);
                }
            }
            TokenKind::Op(Op::Equal) => {
                let mut targets = vec![(first, start, mark)];
                while self.eat_op(Op::Equal) {
                    let at = self.peek().clone();
                    let mark = self.symbols.mark();
                    let value = self.parse_star_expressions_or_yield()?;
                    targets.push((value, at, mark));
                }
                if let Some((value, at, _)) = targets.pop() {
                    self.reject_starred_value(&value, &at);
                }
                for (target, at, mark) in &targets {
                    self.check_target(target, at, TargetKind::Assign)?;
                    self.bind_target(target, *mark);
                }
            }
            _ => {
                if matches!(first, Expr::Starred(_)) {
                    return Err(Self::invalid_at(&start, "can't use starred expression here"));
                }
            }
        }
        Ok(())
    }
}

impl Parser {
    /// Parse one f-string replacement field in the scope of the string
    /// literal `at` that holds it
    fn parse_fstring_field(&mut self, text: &str, at: &Token) -> PResult<()> {
        let wrapped = format!("({})", text);
        let tokens = Lexer::nested(&wrapped, self.fstring_depth + 1).tokenize();
        let mut field = Parser::new(tokens);
        field.depth = self.depth;
        field.ctx = self.ctx;
        field.fstring_depth = self.fstring_depth + 1;
        field.symbols = std::mem::take(&mut self.symbols);

        let result = field.parse_expression().and_then(|_| {
            field.expect_newline()?;
            match field.peek().kind {
                TokenKind::EndMarker { .. } => Ok(()),
                _ => Err(field.unexpected()),
            }
        });

        self.symbols = std::mem::take(&mut field.symbols);
        if self.deferred.is_none() {
            self.deferred = field.deferred.take();
        }

        match result {
            Ok(()) => Ok(()),
            Err(Failure::TooComplex) => Err(Failure::TooComplex),
            Err(Failure::Incomplete) => Err(Self::invalid_at(at, "f-string: expecting '}'")),
            Err(Failure::Invalid { message, .. }) if message.starts_with("f-string") => {
                Err(Self::invalid_at(at, message))
            }
            Err(Failure::Invalid { message, .. }) => {
                Err(Self::invalid_at(at, format!("f-string: {}", message)))
            }
        }
    }
}
