use crate::internal::regex_parser::RegexError;
use crate::rule_parser::RuleError;
use thiserror::Error;

/// The result type for the `lexc` crate.
pub type Result<T> = std::result::Result<T, LexError>;

/// The error type for the `lexc` crate: a thin wrapper around a boxed
/// [`LexErrorKind`] so `Result<T>` stays small regardless of which variant
/// is in play.
#[derive(Error, Debug)]
pub struct LexError {
    /// The source of the error.
    pub source: Box<LexErrorKind>,
}

impl LexError {
    /// Create a new `LexError`.
    pub fn new(kind: LexErrorKind) -> Self {
        LexError {
            source: Box::new(kind),
        }
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The error kind type, one variant per origin the crate can fail at.
#[derive(Error, Debug)]
pub enum LexErrorKind {
    /// A pattern failed to parse: unexpected char, unexpected end,
    /// unknown named class, or invalid closure bounds.
    #[error(transparent)]
    Regex(#[from] RegexError),

    /// A rule file failed to parse: unexpected char/token, invalid
    /// option, duplicate rule, or a `(ref)` rule with conditions.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// One or more rule tags never win as a DFA accept state; each
    /// pair is `(shadowed tag, tag that wins in its place)`. Fatal unless
    /// the caller explicitly asked for the overshadow map alone.
    #[error("{0:?} rule(s) are fully shadowed by an earlier rule")]
    Overshadow(Vec<(i32, i32)>),

    /// Attempting to drive a non-BOL-aware `LexerDef` with a BOL-restricted
    /// machine, or naming a machine the table doesn't know about.
    #[error("invalid machine configuration: {0}")]
    InvalidMachineConfig(String),

    /// The runtime matcher got stuck with no reachable accept state, even
    /// after backtracking, at the given byte offset.
    #[error("no match at offset {offset}")]
    NoMatch { offset: usize },
}

impl From<RegexError> for LexError {
    fn from(error: RegexError) -> Self {
        LexError::new(LexErrorKind::Regex(error))
    }
}

impl From<RuleError> for LexError {
    fn from(error: RuleError) -> Self {
        LexError::new(LexErrorKind::Rule(error))
    }
}
