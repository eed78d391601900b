/// Subset construction: joined NFA → DFA.
pub(crate) mod dfa;

/// Module for several ID types.
mod ids;

/// Hopcroft-style DFA minimization.
pub(crate) mod minimizer;

/// Multi-DFA composer: named start conditions + BOL variants joined under
/// a selector state.
pub(crate) mod multi_dfa;

/// Thompson construction: expression tree → ε-NFA, multi-pattern join.
pub(crate) mod nfa;

/// The regex expression tree produced by `regex_parser`.
pub(crate) mod regex_ast;

/// The regex syntax parser: trailing context, POSIX classes, `<<EOF>>`.
pub(crate) mod regex_parser;
