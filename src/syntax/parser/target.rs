// src/syntax/parser/target.rs
// Expression summaries and assignment-target rules

use super::{PResult, Parser};
use crate::syntax::token::Token;

/// Just enough of an expression's shape to validate it as a target
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Name(String),
    Attribute,
    Subscript,
    Starred(Box<Expr>),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Other(ExprKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExprKind {
    Literal,
    Constant(&'static str),
    Ellipsis,
    Call,
    Operator,
    Comparison,
    Conditional,
    Lambda,
    Await,
    Yield,
    Comprehension,
    Dict,
    Set,
    NamedExpr,
}

impl Expr {
    /// Noun used in error messages ("cannot assign to function call")
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Name(_) => "name",
            Expr::Attribute => "attribute",
            Expr::Subscript => "subscript",
            Expr::Starred(_) => "starred",
            Expr::Tuple(_) => "tuple",
            Expr::List(_) => "list",
            Expr::Other(kind) => match kind {
                ExprKind::Literal => "literal",
                ExprKind::Constant(name) => *name,
                ExprKind::Ellipsis => "ellipsis",
                ExprKind::Call => "function call",
                ExprKind::Operator => "expression",
                ExprKind::Comparison => "comparison",
                ExprKind::Conditional => "conditional expression",
                ExprKind::Lambda => "lambda",
                ExprKind::Await => "await expression",
                ExprKind::Yield => "yield expression",
                ExprKind::Comprehension => "comprehension",
                ExprKind::Dict => "dict literal",
                ExprKind::Set => "set display",
                ExprKind::NamedExpr => "named expression",
            },
        }
    }

    /// Plain names this target binds, unpacking included
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Expr::Name(name) => vec![name.as_str()],
            Expr::Starred(inner) => inner.bound_names(),
            Expr::Tuple(elts) | Expr::List(elts) => elts.iter().flat_map(Expr::bound_names).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetKind {
    Assign,
    For,
    With,
    Del,
}

impl Parser {
    /// Targets of `=`, `for`, `with ... as` and `del`
    pub(super) fn check_target(&self, expr: &Expr, at: &Token, kind: TargetKind) -> PResult<()> {
        match expr {
            Expr::Name(name) if name == "__debug__" => Err(Self::invalid_at(at, "cannot assign to __debug__")),
            Expr::Name(_) | Expr::Attribute | Expr::Subscript => Ok(()),
            Expr::Starred(_) if kind == TargetKind::Del => Err(Self::invalid_at(at, "cannot delete starred")),
            Expr::Starred(_) => Err(Self::invalid_at(
                at,
                "starred assignment target must be in a list or tuple",
            )),
            Expr::Tuple(elts) | Expr::List(elts) => {
                let mut starred = 0;
                for elt in elts {
                    match elt {
                        Expr::Starred(_) if kind == TargetKind::Del => {
                            return Err(Self::invalid_at(at, "cannot delete starred"));
                        }
                        Expr::Starred(inner) => {
                            starred += 1;
                            self.check_target(inner, at, kind)?;
                        }
                        _ => self.check_target(elt, at, kind)?,
                    }
                }
                if starred > 1 {
                    return Err(Self::invalid_at(at, "multiple starred expressions in assignment"));
                }
                Ok(())
            }
            Expr::Other(_) => {
                let verb = if kind == TargetKind::Del { "delete" } else { "assign to" };
                Err(Self::invalid_at(at, format!("cannot {} {}", verb, expr.describe())))
            }
        }
    }

    pub(super) fn check_augassign_target(&self, expr: &Expr, at: &Token) -> PResult<()> {
        match expr {
            Expr::Name(name) if name == "__debug__" => Err(Self::invalid_at(at, "cannot assign to __debug__")),
            Expr::Name(_) | Expr::Attribute | Expr::Subscript => Ok(()),
            _ => Err(Self::invalid_at(
                at,
                format!("'{}' is an illegal expression for augmented assignment", expr.describe()),
            )),
        }
    }

    pub(super) fn check_annotation_target(&self, expr: &Expr, at: &Token) -> PResult<()> {
        match expr {
            Expr::Name(name) if name == "__debug__" => Err(Self::invalid_at(at, "cannot assign to __debug__")),
            Expr::Name(_) | Expr::Attribute | Expr::Subscript => Ok(()),
            Expr::Tuple(_) => Err(Self::invalid_at(at, "only single target (not tuple) can be annotated")),
            Expr::List(_) => Err(Self::invalid_at(at, "only single target (not list) can be annotated")),
            _ => Err(Self::invalid_at(at, "illegal target for annotation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Failure;
    use super::Expr;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    fn message(source: &str) -> String {
        match Parser::new(Lexer::new(source).tokenize()).parse_interactive() {
            Err(Failure::Invalid { message, .. }) => message,
            other => panic!("expected invalid for {:?}, got {:?}", source, other),
        }
    }

    fn ok(source: &str) -> bool {
        Parser::new(Lexer::new(source).tokenize()).parse_interactive().is_ok()
    }

    #[test]
    fn test_assignable_targets() {
        assert!(ok("a = b = c"));
        assert!(ok("a.b, c[0], *d = e"));
        assert!(ok("[a, (b, c)] = x"));
        assert!(ok("(a) = 1"));
        assert!(ok("for k, v in d.items(): pass"));
        assert!(ok("x: int"));
        assert!(ok("self.x: int = 1"));
        assert!(ok("a[i] += 1"));
    }

    #[test]
    fn test_rejected_targets() {
        assert_eq!(message("1 = x"), "cannot assign to literal");
        assert_eq!(message("f() = x"), "cannot assign to function call");
        assert_eq!(message("None = 1"), "cannot assign to None");
        assert_eq!(message("a + b = c"), "cannot assign to expression");
        assert_eq!(message("x = 1 = y"), "cannot assign to literal");
        assert_eq!(message("__debug__ = 1"), "cannot assign to __debug__");
        assert_eq!(message("*a = b"), "starred assignment target must be in a list or tuple");
        assert_eq!(message("*a, *b = c"), "multiple starred expressions in assignment");
        assert_eq!(message("for 1 in x: pass"), "cannot assign to literal");
        assert_eq!(message("del f()"), "cannot delete function call");
    }

    #[test]
    fn test_augmented_and_annotated() {
        assert_eq!(
            message("a, b += 1"),
            "'tuple' is an illegal expression for augmented assignment"
        );
        assert_eq!(message("a, b: int"), "only single target (not tuple) can be annotated");
        assert_eq!(message("f(): int"), "illegal target for annotation");
    }

    #[test]
    fn test_bound_names_skip_attributes() {
        let target = Expr::Tuple(vec![
            Expr::Name("a".into()),
            Expr::Attribute,
            Expr::Starred(Box::new(Expr::List(vec![Expr::Name("b".into()), Expr::Subscript]))),
        ]);
        assert_eq!(target.bound_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_bare_starred_statement() {
        assert_eq!(message("*a"), "can't use starred expression here");
        assert!(ok("*a, b = c"));
    }
}
