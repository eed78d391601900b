//! The regex expression tree produced by [`super::regex_parser`].
//!
//! `regex_syntax::ast::Ast` can be visited with a `Visitor` impl;
//! our grammar is our own (trailing context, POSIX classes, `<<EOF>>`), so
//! the tree is a closed sum type matched directly rather than visited.

use crate::symbol::{Symbol, SymbolSet};
use std::fmt;

/// Used as the upper closure bound for `*`/`+`/`{m,}`.
pub(crate) const INFINITE: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Empty,
    Character(Symbol),
    CharacterClass(SymbolSet),
    Dot,
    BeginOfLine,
    EndOfLine,
    EndOfFile,
    Concatenation(Box<Expr>, Box<Expr>),
    Alternation(Box<Expr>, Box<Expr>),
    /// `(sub, min, max)`; invariant: `min <= max`.
    Closure(Box<Expr>, u32, u32),
    LookAhead(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Binding strength, used only for deciding when `Display` needs parens.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Alternation(..) => 1,
            Expr::LookAhead(..) => 2,
            Expr::Concatenation(..) => 3,
            Expr::Closure(..) => 4,
            _ => 5,
        }
    }

    fn fmt_child(&self, child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl Expr {
    /// Rewrites every trailing `… $` into trailing-context form
    /// (`LookAhead(…, '\n')`), the form the NFA builder knows how to turn
    /// into a backtrack anchor. A bare `$` becomes `LookAhead(Empty, '\n')`.
    pub(crate) fn desugar_eol(self) -> Expr {
        match self {
            Expr::EndOfLine => Expr::LookAhead(
                Box::new(Expr::Empty),
                Box::new(Expr::Character(b'\n' as Symbol)),
            ),
            Expr::Concatenation(l, r) => {
                if matches!(*r, Expr::EndOfLine) {
                    Expr::LookAhead(
                        Box::new(l.desugar_eol()),
                        Box::new(Expr::Character(b'\n' as Symbol)),
                    )
                } else {
                    Expr::Concatenation(Box::new(l.desugar_eol()), Box::new(r.desugar_eol()))
                }
            }
            Expr::Alternation(l, r) => {
                Expr::Alternation(Box::new(l.desugar_eol()), Box::new(r.desugar_eol()))
            }
            Expr::Closure(sub, min, max) => Expr::Closure(Box::new(sub.desugar_eol()), min, max),
            Expr::LookAhead(l, r) => {
                Expr::LookAhead(Box::new(l.desugar_eol()), Box::new(r.desugar_eol()))
            }
            other => other,
        }
    }

    /// Whether this rule's pattern only ever matches at the start of a
    /// line. Used by the multi-DFA composer to decide whether a
    /// rule belongs in the BOL-restricted variant, the unrestricted one, or
    /// (for something like `^a|b`) both.
    pub(crate) fn starts_with_bol(&self) -> bool {
        match self {
            Expr::BeginOfLine => true,
            Expr::Concatenation(l, _) => l.starts_with_bol(),
            Expr::LookAhead(l, _) => l.starts_with_bol(),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => Ok(()),
            Expr::Character(c) => {
                if crate::symbol::is_byte(*c) {
                    write!(f, "{}", *c as u8 as char)
                } else {
                    write!(f, "<{}>", c)
                }
            }
            Expr::CharacterClass(set) => {
                write!(f, "[")?;
                for b in set.iter() {
                    write!(f, "{}", b as char)?;
                }
                write!(f, "]")
            }
            Expr::Dot => write!(f, "."),
            Expr::BeginOfLine => write!(f, "^"),
            Expr::EndOfLine => write!(f, "$"),
            Expr::EndOfFile => write!(f, "<<EOF>>"),
            Expr::Concatenation(l, r) => {
                self.fmt_child(l, f)?;
                self.fmt_child(r, f)
            }
            Expr::Alternation(l, r) => {
                self.fmt_child(l, f)?;
                write!(f, "|")?;
                self.fmt_child(r, f)
            }
            Expr::Closure(sub, min, max) => {
                self.fmt_child(sub, f)?;
                match (*min, *max) {
                    (0, 1) => write!(f, "?"),
                    (0, INFINITE) => write!(f, "*"),
                    (1, INFINITE) => write!(f, "+"),
                    (m, n) if m == n => write!(f, "{{{}}}", m),
                    (m, n) => write!(f, "{{{},{}}}", m, n),
                }
            }
            Expr::LookAhead(l, r) => {
                self.fmt_child(l, f)?;
                write!(f, "/")?;
                self.fmt_child(r, f)
            }
        }
    }
}
