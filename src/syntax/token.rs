// src/syntax/token.rs
// Token definitions for the Python tokenizer

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Name(String),
    Keyword(Keyword),
    Number {
        imaginary: bool,
    },
    /// One string literal. `fields` holds the source of each replacement
    /// field of an f-string, nested format-spec fields included.
    String {
        bytes: bool,
        formatted: bool,
        fields: Vec<String>,
    },
    Op(Op),
    Newline,
    Indent,
    Dedent,
    /// End of a well-formed token stream. `joined` is set when the input
    /// stopped right after a backslash line join.
    EndMarker { joined: bool },
    /// Input ended inside a construct that more lines could finish
    Incomplete,
    /// Lexical error; nothing after it was tokenized
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    False,
    None,
    True,
    And,
    As,
    Assert,
    Async,
    Await,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    With,
    Yield,
}

impl Keyword {
    pub fn lookup(ident: &str) -> Option<Self> {
        let kw = match ident {
            "False" => Self::False,
            "None" => Self::None,
            "True" => Self::True,
            "and" => Self::And,
            "as" => Self::As,
            "assert" => Self::Assert,
            "async" => Self::Async,
            "await" => Self::Await,
            "break" => Self::Break,
            "class" => Self::Class,
            "continue" => Self::Continue,
            "def" => Self::Def,
            "del" => Self::Del,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "except" => Self::Except,
            "finally" => Self::Finally,
            "for" => Self::For,
            "from" => Self::From,
            "global" => Self::Global,
            "if" => Self::If,
            "import" => Self::Import,
            "in" => Self::In,
            "is" => Self::Is,
            "lambda" => Self::Lambda,
            "nonlocal" => Self::Nonlocal,
            "not" => Self::Not,
            "or" => Self::Or,
            "pass" => Self::Pass,
            "raise" => Self::Raise,
            "return" => Self::Return,
            "try" => Self::Try,
            "while" => Self::While,
            "with" => Self::With,
            "yield" => Self::Yield,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::False => "False",
            Self::None => "None",
            Self::True => "True",
            Self::And => "and",
            Self::As => "as",
            Self::Assert => "assert",
            Self::Async => "async",
            Self::Await => "await",
            Self::Break => "break",
            Self::Class => "class",
            Self::Continue => "continue",
            Self::Def => "def",
            Self::Del => "del",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Except => "except",
            Self::Finally => "finally",
            Self::For => "for",
            Self::From => "from",
            Self::Global => "global",
            Self::If => "if",
            Self::Import => "import",
            Self::In => "in",
            Self::Is => "is",
            Self::Lambda => "lambda",
            Self::Nonlocal => "nonlocal",
            Self::Not => "not",
            Self::Or => "or",
            Self::Pass => "pass",
            Self::Raise => "raise",
            Self::Return => "return",
            Self::Try => "try",
            Self::While => "while",
            Self::With => "with",
            Self::Yield => "yield",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Semi,
    Dot,
    Ellipsis,
    Arrow,
    ColonEqual,
    Equal,
    At,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Amp,
    VBar,
    Circumflex,
    Tilde,
    LeftShift,
    RightShift,
    Less,
    Greater,
    EqEqual,
    NotEqual,
    LessEqual,
    GreaterEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    DoubleStarEqual,
    SlashEqual,
    DoubleSlashEqual,
    PercentEqual,
    AtEqual,
    AmpEqual,
    VBarEqual,
    CircumflexEqual,
    LeftShiftEqual,
    RightShiftEqual,
}

/// Operators ordered longest first so the lexer can take the first match.
pub const OPERATORS: &[(&str, Op)] = &[
    ("**=", Op::DoubleStarEqual),
    ("//=", Op::DoubleSlashEqual),
    (">>=", Op::RightShiftEqual),
    ("<<=", Op::LeftShiftEqual),
    ("...", Op::Ellipsis),
    ("->", Op::Arrow),
    (":=", Op::ColonEqual),
    ("**", Op::DoubleStar),
    ("//", Op::DoubleSlash),
    ("<<", Op::LeftShift),
    (">>", Op::RightShift),
    ("==", Op::EqEqual),
    ("!=", Op::NotEqual),
    ("<=", Op::LessEqual),
    (">=", Op::GreaterEqual),
    ("+=", Op::PlusEqual),
    ("-=", Op::MinusEqual),
    ("*=", Op::StarEqual),
    ("/=", Op::SlashEqual),
    ("%=", Op::PercentEqual),
    ("@=", Op::AtEqual),
    ("&=", Op::AmpEqual),
    ("|=", Op::VBarEqual),
    ("^=", Op::CircumflexEqual),
    ("(", Op::LParen),
    (")", Op::RParen),
    ("[", Op::LBracket),
    ("]", Op::RBracket),
    ("{", Op::LBrace),
    ("}", Op::RBrace),
    (":", Op::Colon),
    (",", Op::Comma),
    (";", Op::Semi),
    (".", Op::Dot),
    ("=", Op::Equal),
    ("@", Op::At),
    ("+", Op::Plus),
    ("-", Op::Minus),
    ("*", Op::Star),
    ("/", Op::Slash),
    ("%", Op::Percent),
    ("&", Op::Amp),
    ("|", Op::VBar),
    ("^", Op::Circumflex),
    ("~", Op::Tilde),
    ("<", Op::Less),
    (">", Op::Greater),
];

impl Op {
    pub fn is_augassign(self) -> bool {
        matches!(
            self,
            Op::PlusEqual
                | Op::MinusEqual
                | Op::StarEqual
                | Op::DoubleStarEqual
                | Op::SlashEqual
                | Op::DoubleSlashEqual
                | Op::PercentEqual
                | Op::AtEqual
                | Op::AmpEqual
                | Op::VBarEqual
                | Op::CircumflexEqual
                | Op::LeftShiftEqual
                | Op::RightShiftEqual
        )
    }

    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    pub fn is_op(&self, op: Op) -> bool {
        self.kind == TokenKind::Op(op)
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    /// Soft keywords (`match`, `case`, `type`, `_`) lex as plain names.
    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    /// True for the three kinds that end a token stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::EndMarker { .. } | TokenKind::Incomplete | TokenKind::Error(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Name(name) => write!(f, "name '{}'", name),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::Number { .. } => write!(f, "number"),
            TokenKind::String { .. } => write!(f, "string"),
            TokenKind::Op(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::EndMarker { .. } => write!(f, "end of input"),
            TokenKind::Incomplete => write!(f, "incomplete input"),
            TokenKind::Error(msg) => write!(f, "{}", msg),
        }
    }
}
