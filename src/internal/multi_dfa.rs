//! Multi-DFA composer: joins one independently-minimized DFA
//! per start condition under a synthetic selector state `0`, plus an
//! optional begin-of-line variant per condition. The normal variant
//! excludes every `^`-anchored rule (they can never match there); the
//! BOL variant carries every rule, anchored or not, since an ordinary
//! token can still start a line.
//!
//! Grounded on `examples/original_source/src/klex/MultiDFA.cc`'s
//! `constructMultiDFA`: it allocates `1 + conditions.len()` states, marks
//! state `0` as initial, and for each condition's (re-based) sub-DFA sets
//! `transition(0, q0_symbol, q0)` where the symbol value literally equals
//! the new initial state id. `initial_states` is kept as a first-class map
//! alongside that degenerate transition so callers never need to decode it
//! back out of the transition table.

use super::dfa::{Dfa, DfaState};
use super::ids::{StateId, StateIdBase};
use crate::rule::Rule;
use crate::symbol::Symbol;
use rustc_hash::FxHashMap as HashMap;

/// The suffix appended to a condition name to get its BOL-restricted
/// variant's key in `initial_states`.
pub(crate) const BOL_SUFFIX: &str = "_0";

pub(crate) struct MultiDfa {
    pub(crate) states: Vec<DfaState>,
    pub(crate) initial_states: HashMap<String, StateId>,
    pub(crate) contains_bol: bool,
    pub(crate) accept_tags: HashMap<StateId, i32>,
    pub(crate) backtracking: HashMap<StateId, StateId>,
}

/// Appends `dfa`'s states (re-based by the current arena length) into
/// `states`, folding its accept/backtracking maps into the running totals,
/// and returns the re-based initial state id.
fn append(
    states: &mut Vec<DfaState>,
    accept_tags: &mut HashMap<StateId, i32>,
    backtracking: &mut HashMap<StateId, StateId>,
    dfa: Dfa,
) -> StateId {
    let offset = states.len() as StateIdBase;
    let rebase = |id: StateId| id + offset;

    for (&old_id, &tag) in &dfa.accept_tags {
        accept_tags.insert(rebase(old_id), tag);
    }
    for (&old_id, &anchor) in &dfa.backtracking {
        backtracking.insert(rebase(old_id), rebase(anchor));
    }

    for mut state in dfa.states {
        let mut transitions = HashMap::default();
        transitions.reserve(state.transitions.len());
        for (symbol, target) in state.transitions.drain() {
            transitions.insert(symbol, rebase(target));
        }
        states.push(DfaState { transitions });
    }

    rebase(dfa.initial)
}

/// Builds one `MultiDfa` from `conditions`, a list of `(name, rules)` pairs
/// already expanded from any `<*>` wildcard, where `build_dfa` turns one
/// condition's rule set into a minimized `Dfa` (subset construction +
/// minimization, already run by the caller) and may fail with a rule-
/// overshadow error.
pub(crate) fn compose<F, E>(conditions: &[(String, Vec<Rule>)], build_dfa: F) -> Result<MultiDfa, E>
where
    F: Fn(&[Rule]) -> Result<Dfa, E>,
{
    let contains_bol = conditions
        .iter()
        .flat_map(|(_, rules)| rules.iter())
        .any(|r| r.starts_with_bol);

    let mut states: Vec<DfaState> = vec![DfaState::default()];
    let mut accept_tags = HashMap::default();
    let mut backtracking = HashMap::default();
    let mut initial_states = HashMap::default();

    for (name, rules) in conditions {
        let normal_rules: Vec<Rule> = rules
            .iter()
            .filter(|r| !r.starts_with_bol)
            .cloned()
            .collect();
        let normal_dfa = build_dfa(&normal_rules)?;
        let normal_initial = append(&mut states, &mut accept_tags, &mut backtracking, normal_dfa);
        states[0]
            .transitions
            .insert(normal_initial.id() as Symbol, normal_initial);
        initial_states.insert(name.clone(), normal_initial);

        if contains_bol {
            // Every rule, anchored or not, is declared into the BOL
            // variant -- only the normal variant above is restricted to
            // the non-anchored subset.
            let bol_dfa = build_dfa(rules)?;
            let bol_initial = append(&mut states, &mut accept_tags, &mut backtracking, bol_dfa);
            states[0]
                .transitions
                .insert(bol_initial.id() as Symbol, bol_initial);
            initial_states.insert(format!("{name}{BOL_SUFFIX}"), bol_initial);
        }
    }

    Ok(MultiDfa {
        states,
        initial_states,
        contains_bol,
        accept_tags,
        backtracking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::dfa::subset_construct;
    use crate::internal::minimizer::minimize;
    use crate::internal::nfa::{from_expr, join};
    use crate::internal::regex_parser;
    use crate::rule::{FIRST_USER_TAG, INITIAL_CONDITION};

    fn rule(name: &str, pattern: &str, bol: bool) -> Rule {
        Rule {
            line: 1,
            column: 1,
            tag: FIRST_USER_TAG,
            conditions: vec![INITIAL_CONDITION.to_string()],
            name: name.to_string(),
            pattern: pattern.to_string(),
            is_ref: false,
            starts_with_bol: bol,
        }
    }

    fn build_dfa(rules: &[Rule]) -> Result<Dfa, ()> {
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
    fn each_condition_gets_a_selector_entry() {
        let conditions = vec![
            ("INITIAL".to_string(), vec![rule("A", "a", false)]),
            ("STRING".to_string(), vec![rule("B", "b", false)]),
        ];
        let multi = compose(&conditions, build_dfa).unwrap();
        assert!(!multi.contains_bol);
        assert_eq!(multi.initial_states.len(), 2);
        assert!(multi.initial_states.contains_key("INITIAL"));
        assert!(multi.initial_states.contains_key("STRING"));
    }

    #[test]
    fn bol_rule_produces_a_variant_per_condition() {
        let conditions = vec![("INITIAL".to_string(), vec![rule("A", "a", true)])];
        let multi = compose(&conditions, build_dfa).unwrap();
        assert!(multi.contains_bol);
        assert!(multi.initial_states.contains_key("INITIAL_0"));
    }

    #[test]
    fn bol_variant_still_recognizes_non_anchored_rules() {
        let conditions = vec![(
            "INITIAL".to_string(),
            vec![rule("Anchored", "a", true), rule("Plain", "b", false)],
        )];
        let multi = compose(&conditions, build_dfa).unwrap();
        let bol_initial = multi.initial_states["INITIAL_0"];
        assert_eq!(
            multi.states[bol_initial.as_usize()].transitions.len(),
            2,
            "the BOL variant must still accept 'b' at begin-of-line"
        );
    }
}
