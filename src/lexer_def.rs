//! The table emitter and the `LexerDef` artifact it produces: a plain-data
//! snapshot of a compiled lexer, with no behavior of its own beyond what
//! the runtime matcher reads back out of it.
//!
//! Grounded on `examples/original_source/src/klex/LexerDef.h`'s field
//! names (`initialStateId`/`transitions`/`acceptStates`/
//! `backtrackingStates`/`tagNames`), adapted to a multi-machine
//! `initialStates: map<name, id>` table, and on `compiled_dfa.rs`'s habit
//! of converting a logical sparse-map representation into the shape the
//! runtime consumes directly.

use crate::internal::multi_dfa::MultiDfa;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Not a real state id; returned by the runtime matcher in place of any
/// state with no outgoing transition for the current symbol. Kept distinct
/// from every real `u32` state id used in practice (state ids come from
/// dense array indices, never from this end of the range).
pub(crate) const ERROR_SENTINEL: u32 = u32::MAX - 1;

/// Identifies one compiled start-condition machine within a [`LexerDef`].
/// Carries the machine's initial state id directly, mirroring the
/// original's `using Machine = StateId` alias rather than adding a second,
/// independently-numbered id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineId(pub u32);

impl std::fmt::Display for MachineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The compile-time output handed to the runtime matcher: a flattened,
/// immutable table with no behavior of its own. Cheap to clone and safe to
/// share by reference across threads.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LexerDef {
    /// Start-condition name → that machine's initial state id (and, if a
    /// BOL-restricted variant exists, `"{name}_0"` → its initial id too).
    pub initial_states: HashMap<String, u32>,
    /// Whether any rule was restricted to begin-of-line; if `false`,
    /// `set_machine` rejects BOL-variant names and the runtime never
    /// checks `isBOL`.
    pub contains_bol: bool,
    /// `{state: {symbol: state}}`, sparse: absent entries mean `ErrorState`.
    pub transitions: HashMap<u32, HashMap<i32, u32>>,
    /// `state → tag` for every accepting state.
    pub accept_states: HashMap<u32, i32>,
    /// `state → anchor state` for every state reached at the end of a
    /// trailing-context match, used to roll input back to the `r`/`s`
    /// split point.
    pub backtracking: HashMap<u32, u32>,
    /// `tag → rule name`, for diagnostics and `Lexer::token`-adjacent APIs.
    pub tag_names: HashMap<i32, String>,
}

impl LexerDef {
    /// Flattens a composed [`MultiDfa`] plus the originating rule tag →
    /// name table into the wire-stable `LexerDef` shape.
    pub(crate) fn from_multi_dfa(multi: MultiDfa, tag_names: HashMap<i32, String>) -> LexerDef {
        let initial_states = multi
            .initial_states
            .into_iter()
            .map(|(name, id)| (name, id.id()))
            .collect();

        let mut transitions: HashMap<u32, HashMap<i32, u32>> = HashMap::new();
        for (idx, state) in multi.states.iter().enumerate() {
            if state.transitions.is_empty() {
                continue;
            }
            let row: HashMap<i32, u32> = state
                .transitions
                .iter()
                .map(|(&sym, &target)| (sym as i32, target.id()))
                .collect();
            transitions.insert(idx as u32, row);
        }

        let accept_states = multi
            .accept_tags
            .into_iter()
            .map(|(id, tag)| (id.id(), tag))
            .collect();

        let backtracking = multi
            .backtracking
            .into_iter()
            .map(|(id, anchor)| (id.id(), anchor.id()))
            .collect();

        LexerDef {
            initial_states,
            contains_bol: multi.contains_bol,
            transitions,
            accept_states,
            backtracking,
            tag_names,
        }
    }

    /// The initial state of the named machine, if the table has one.
    pub(crate) fn initial_state(&self, machine: &str) -> Option<MachineId> {
        self.initial_states.get(machine).copied().map(MachineId)
    }

    /// `δ(state, symbol)`, or `None` for `ErrorState`.
    pub(crate) fn step(&self, state: u32, symbol: i32) -> Option<u32> {
        self.transitions.get(&state)?.get(&symbol).copied()
    }

    pub(crate) fn accept_tag(&self, state: u32) -> Option<i32> {
        self.accept_states.get(&state).copied()
    }

    pub(crate) fn backtrack_anchor(&self, state: u32) -> Option<u32> {
        self.backtracking.get(&state).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::dfa::subset_construct;
    use crate::internal::minimizer::minimize;
    use crate::internal::multi_dfa::compose;
    use crate::internal::nfa::{from_expr, join};
    use crate::internal::regex_parser;
    use crate::rule::{Rule, FIRST_USER_TAG, INITIAL_CONDITION};

    fn rule(name: &str, pattern: &str) -> Rule {
        Rule {
            line: 1,
            column: 1,
            tag: FIRST_USER_TAG,
            conditions: vec![INITIAL_CONDITION.to_string()],
            name: name.to_string(),
            pattern: pattern.to_string(),
            is_ref: false,
            starts_with_bol: false,
        }
    }

    fn build_dfa(rules: &[Rule]) -> Result<crate::internal::dfa::Dfa, ()> {
        let fragments = rules
            .iter()
            .map(|r| {
                let expr = regex_parser::parse(&r.pattern, r.line, r.column)
                    .unwrap()
                    .desugar_eol();
                (from_expr(&expr), r.tag)
            })
            .collect();
        Ok(minimize(&subset_construct(&join(fragments)).dfa))
    }

    #[test]
    fn flattens_into_plain_maps() {
        let conditions = vec![(
            INITIAL_CONDITION.to_string(),
            vec![rule("NUM", "[0-9]+")],
        )];
        let multi = compose(&conditions, build_dfa).unwrap();
        let mut tag_names = HashMap::new();
        tag_names.insert(FIRST_USER_TAG, "NUM".to_string());
        let def = LexerDef::from_multi_dfa(multi, tag_names);

        assert!(def.initial_state(INITIAL_CONDITION).is_some());
        assert!(!def.transitions.is_empty());
        assert!(def.accept_states.values().any(|&t| t == FIRST_USER_TAG));
    }
}
