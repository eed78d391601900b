#![forbid(missing_docs)]
//! # `lexc`
//! A lexical-analyzer generator and runtime: compiles lex/flex-style rule
//! files (regex patterns bound to tags and named start conditions) into a
//! `LexerDef` table through the classic pipeline -- regex parse, Thompson
//! construction, subset construction, Hopcroft minimization, multi-DFA
//! composition -- and drives that table with a `Lexer` runtime matcher that
//! performs longest-match scanning with trailing-context backtracking.

/// Compile pipeline: rule-file text to a [`LexerDef`].
mod compile;
pub use compile::{compile, CompileOptions};

/// Module with error definitions.
mod errors;
pub use errors::{LexError, LexErrorKind, Result};

/// The module with internal implementation details.
mod internal;
pub use internal::regex_parser::RegexError;

/// The compiled table artifact and its machine-id type.
mod lexer_def;
pub use lexer_def::{LexerDef, MachineId};

/// The `Rule` record and its tag/condition constants.
mod rule;
pub use rule::{Rule, Tag, FIRST_USER_TAG, IGNORE_TAG, INITIAL_CONDITION};

/// The rule-file parser.
mod rule_parser;
pub use rule_parser::{parse_rules, RuleError};

/// The runtime matcher.
mod runtime;
pub use runtime::{Lexer, LexerInput, TokenInfo};

/// Module that provides a Span type.
mod span;
pub use span::Span;

/// The fixed input alphabet and its sentinel symbol values.
mod symbol;
