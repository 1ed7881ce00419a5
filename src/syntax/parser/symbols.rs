// src/syntax/parser/symbols.rs
// Per-scope name usage, for the declaration checks made after parsing
//
// Every def, lambda and class body opens a block. Comprehensions share the
// block around them: loads inside a comprehension are dropped and its
// iteration variables are never recorded.

use crate::syntax::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Module,
    Function,
    Class,
}

/// One way a block refers to a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Use,
    Bind,
    Param,
    Annotate,
    Global,
    Nonlocal,
}

#[derive(Debug, Clone)]
struct Block {
    kind: BlockKind,
    usages: Vec<(String, Usage)>,
    /// `nonlocal` declarations made directly in this block
    nonlocals: Vec<(String, Token)>,
    /// Declarations from nested blocks still looking for a binding
    pending: Vec<(String, Token)>,
    /// Assignment expression targets, in source order
    named: Vec<(String, Token)>,
    yields: Vec<Token>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            usages: Vec::new(),
            nonlocals: Vec::new(),
            pending: Vec::new(),
            named: Vec::new(),
            yields: Vec::new(),
        }
    }

    fn has(&self, name: &str, usage: Usage) -> bool {
        self.usages.iter().any(|(n, u)| n == name && *u == usage)
    }

    fn binds(&self, name: &str) -> bool {
        let bound = self.has(name, Usage::Bind) || self.has(name, Usage::Param) || self.has(name, Usage::Annotate);
        bound && !self.has(name, Usage::Global) && !self.has(name, Usage::Nonlocal)
    }

    /// Whether a `nonlocal` from a nested block finds its binding here
    fn resolves(&self, name: &str) -> bool {
        match self.kind {
            BlockKind::Function => self.binds(name),
            BlockKind::Class => name == "__class__",
            BlockKind::Module => false,
        }
    }

    /// Message for a `global` or `nonlocal` declaration that comes too late
    fn declaration_conflict(&self, name: &str, keyword: &str) -> Option<String> {
        let message = if self.has(name, Usage::Param) {
            format!("name '{}' is parameter and {}", name, keyword)
        } else if self.has(name, Usage::Use) {
            format!("name '{}' is used prior to {} declaration", name, keyword)
        } else if self.has(name, Usage::Annotate) {
            format!("annotated name '{}' can't be {}", name, keyword)
        } else if self.has(name, Usage::Bind) {
            format!("name '{}' is assigned to before {} declaration", name, keyword)
        } else {
            return None;
        };
        Some(message)
    }
}

/// Position in the current block's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
    usages: usize,
    named: usize,
    yields: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SymbolTable {
    current: Block,
    enclosing: Vec<Block>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            current: Block::new(BlockKind::Module),
            enclosing: Vec::new(),
        }
    }

    pub fn enter(&mut self, kind: BlockKind) {
        let outer = std::mem::replace(&mut self.current, Block::new(kind));
        self.enclosing.push(outer);
    }

    /// Close the current block and hand its unresolved `nonlocal`
    /// declarations to the block around it
    pub fn exit(&mut self) {
        let Some(outer) = self.enclosing.pop() else {
            return;
        };
        let block = std::mem::replace(&mut self.current, outer);
        let carried = block
            .pending
            .iter()
            .filter(|(name, _)| !block.resolves(name))
            .cloned()
            .chain(block.nonlocals.iter().cloned());
        self.current.pending.extend(carried);
    }

    /// A `nonlocal` declaration no enclosing function binds. Only
    /// meaningful once every nested block has been closed.
    pub fn unresolved(&self) -> Option<&(String, Token)> {
        if self.enclosing.is_empty() {
            self.current.pending.first()
        } else {
            None
        }
    }

    pub fn in_class(&self) -> bool {
        self.current.kind == BlockKind::Class
    }

    pub fn mark(&self) -> Mark {
        Mark {
            usages: self.current.usages.len(),
            named: self.current.named.len(),
            yields: self.current.yields.len(),
        }
    }

    fn record(&mut self, name: &str, usage: Usage) {
        self.current.usages.push((name.to_string(), usage));
    }

    pub fn use_name(&mut self, name: &str) {
        self.record(name, Usage::Use);
    }

    pub fn bind(&mut self, name: &str) {
        self.record(name, Usage::Bind);
    }

    pub fn param(&mut self, name: &str) {
        self.record(name, Usage::Param);
    }

    /// Bind an assignment target parsed after `since`. The load recorded
    /// while parsing the target itself is dropped.
    pub fn store(&mut self, name: &str, since: Mark) {
        self.retract(name, since);
        self.record(name, Usage::Bind);
    }

    /// `name: annotation` on a plain name
    pub fn annotate(&mut self, name: &str, since: Mark) -> Result<(), String> {
        self.retract(name, since);
        let outcome = if self.current.kind == BlockKind::Module {
            Ok(())
        } else if self.current.has(name, Usage::Global) {
            Err(format!("annotated name '{}' can't be global", name))
        } else if self.current.has(name, Usage::Nonlocal) {
            Err(format!("annotated name '{}' can't be nonlocal", name))
        } else {
            Ok(())
        };
        self.record(name, Usage::Annotate);
        outcome
    }

    pub fn named_expr(&mut self, name: &str, tok: &Token) {
        self.record(name, Usage::Bind);
        self.current.named.push((name.to_string(), tok.clone()));
    }

    pub fn yielded(&mut self, tok: &Token) {
        self.current.yields.push(tok.clone());
    }

    fn retract(&mut self, name: &str, since: Mark) {
        let found = self
            .current
            .usages
            .get(since.usages..)
            .and_then(|tail| tail.iter().position(|(n, u)| n == name && *u == Usage::Use));
        if let Some(offset) = found {
            self.current.usages.remove(since.usages + offset);
        }
    }

    /// Drop every load recorded after `since`
    pub fn forget_uses(&mut self, since: Mark) {
        if since.usages > self.current.usages.len() {
            return;
        }
        let tail = self.current.usages.split_off(since.usages);
        self.current
            .usages
            .extend(tail.into_iter().filter(|(_, usage)| *usage != Usage::Use));
    }

    pub fn named_since(&self, since: Mark) -> &[(String, Token)] {
        self.current.named.get(since.named..).unwrap_or(&[])
    }

    pub fn yield_since(&self, since: Mark) -> Option<&Token> {
        self.current.yields.get(since.yields..).and_then(|tail| tail.first())
    }

    pub fn declare_global(&mut self, name: &str) -> Result<(), String> {
        let outcome = match self.current.declaration_conflict(name, "global") {
            Some(message) => Err(message),
            None if self.current.has(name, Usage::Nonlocal) => {
                Err(format!("name '{}' is nonlocal and global", name))
            }
            None => Ok(()),
        };
        self.record(name, Usage::Global);
        outcome
    }

    /// Declare `name` nonlocal in a function or class block
    pub fn declare_nonlocal(&mut self, name: &str, tok: &Token) -> Result<(), String> {
        let outcome = match self.current.declaration_conflict(name, "nonlocal") {
            Some(message) => Err(message),
            None if self.current.has(name, Usage::Global) => {
                Err(format!("name '{}' is nonlocal and global", name))
            }
            None => Ok(()),
        };
        self.record(name, Usage::Nonlocal);
        self.current.nonlocals.push((name.to_string(), tok.clone()));
        outcome
    }
}
