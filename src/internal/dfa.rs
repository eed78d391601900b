//! Subset construction: joined NFA → DFA.
//!
//! Grounded on `examples/original_source/src/klex/DFABuilder.cc` for the
//! worklist shape; the accept-tag-wins and
//! backtracking-propagation rules the original file predates (its
//! `klex::regular` successor has no single file covering both cleanly, so
//! the accept-tag-wins and backtracking-propagation rules are implemented
//! in the same worklist style).

use super::ids::{StateId, StateIdBase};
use super::nfa::JoinedNfa;
use crate::symbol::Symbol;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct DfaState {
    pub(crate) transitions: HashMap<Symbol, StateId>,
}

/// A deterministic automaton: every state has at most one outgoing edge per
/// symbol (absence means `ErrorState`).
#[derive(Debug, Clone)]
pub(crate) struct Dfa {
    pub(crate) states: Vec<DfaState>,
    pub(crate) initial: StateId,
    pub(crate) accept_tags: HashMap<StateId, i32>,
    pub(crate) backtracking: HashMap<StateId, StateId>,
}

/// The result of subset construction: the DFA plus every rule tag that got
/// shadowed out of existence, paired with whichever tag wins in its place.
/// A non-empty `overshadowed` map is a compiler error.
pub(crate) struct DfaBuildResult {
    pub(crate) dfa: Dfa,
    pub(crate) overshadowed: BTreeMap<i32, i32>,
}

/// Runs subset construction on `nfa`, assigning each DFA state the
/// numerically smallest tag among its member NFA accept states ("rules
/// declared earlier take precedence"), and propagating backtracking: a DFA
/// state whose configuration contains a backtrack-map key inherits
/// backtracking toward the DFA state representing the configuration that
/// contains the mapped anchor.
pub(crate) fn subset_construct(nfa: &JoinedNfa) -> DfaBuildResult {
    let alphabet = nfa.alphabet();

    let mut config_to_id: HashMap<Vec<StateId>, StateId> = HashMap::default();
    let mut configs: Vec<Vec<StateId>> = Vec::new();
    let mut states: Vec<DfaState> = Vec::new();
    let mut accept_tags: HashMap<StateId, i32> = HashMap::default();

    let q0 = nfa.epsilon_closure(&[nfa.start]);
    config_to_id.insert(q0.clone(), StateId::new(0));
    configs.push(q0);
    states.push(DfaState::default());

    let mut worklist = vec![StateId::new(0)];
    while let Some(q_id) = worklist.pop() {
        let q = configs[q_id.as_usize()].clone();

        if let Some(tag) = q
            .iter()
            .filter_map(|s| nfa.accept_tags.get(s))
            .min()
            .copied()
        {
            accept_tags.insert(q_id, tag);
        }

        for &symbol in &alphabet {
            let moved = nfa.mv(&q, symbol);
            if moved.is_empty() {
                continue;
            }
            let target_config = nfa.epsilon_closure(&moved);
            let target_id = *config_to_id.entry(target_config.clone()).or_insert_with(|| {
                let id = StateId::new(configs.len() as StateIdBase);
                configs.push(target_config);
                states.push(DfaState::default());
                worklist.push(id);
                id
            });
            states[q_id.as_usize()].transitions.insert(symbol, target_id);
        }
    }

    // A given NFA state can appear in several configurations; remember the
    // first (lowest-id) DFA state whose configuration contains it so
    // backtracking has a concrete target to point at. flex calls the
    // general case "dangerous trailing context" for the same reason: an
    // anchor state shared by overlapping configurations is inherently
    // ambiguous, so picking the earliest-built representative is the same
    // pragmatic call flex's own analysis makes.
    let mut first_containing: HashMap<StateId, StateId> = HashMap::default();
    for (idx, config) in configs.iter().enumerate() {
        let dfa_id = StateId::new(idx as StateIdBase);
        for &member in config {
            first_containing.entry(member).or_insert(dfa_id);
        }
    }

    let mut backtracking: HashMap<StateId, StateId> = HashMap::default();
    for (idx, config) in configs.iter().enumerate() {
        let dfa_id = StateId::new(idx as StateIdBase);
        for member in config {
            if let Some(anchor) = nfa.backtrack.get(member) {
                if let Some(&anchor_dfa) = first_containing.get(anchor) {
                    backtracking.insert(dfa_id, anchor_dfa);
                }
            }
        }
    }

    let dfa = Dfa {
        states,
        initial: StateId::new(0),
        accept_tags,
        backtracking,
    };

    let overshadowed = overshadowed_tags(nfa, &dfa, &configs);

    DfaBuildResult { dfa, overshadowed }
}

/// Finds every rule tag that never wins as a DFA state's accept tag, paired
/// with the tag that wins wherever that rule's accepts are reached.
fn overshadowed_tags(
    nfa: &JoinedNfa,
    dfa: &Dfa,
    configs: &[Vec<StateId>],
) -> BTreeMap<i32, i32> {
    let winning: HashSet<i32> = dfa.accept_tags.values().copied().collect();
    let mut result = BTreeMap::new();

    for (&nfa_state, &tag) in &nfa.accept_tags {
        if winning.contains(&tag) {
            continue;
        }
        for (idx, config) in configs.iter().enumerate() {
            if !config.contains(&nfa_state) {
                continue;
            }
            let dfa_id = StateId::new(idx as StateIdBase);
            if let Some(&winner) = dfa.accept_tags.get(&dfa_id) {
                result.entry(tag).or_insert(winner);
                break;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::nfa::{from_expr, join};
    use crate::internal::regex_parser;

    fn fragment(pattern: &str) -> crate::internal::nfa::Nfa {
        let expr = regex_parser::parse(pattern, 1, 1).unwrap().desugar_eol();
        from_expr(&expr)
    }

    #[test]
    fn single_pattern_accepts_with_its_tag() {
        let joined = join(vec![(fragment("ab"), 1)]);
        let result = subset_construct(&joined);
        assert!(result.overshadowed.is_empty());
        assert!(result.dfa.accept_tags.values().any(|&t| t == 1));
    }

    #[test]
    fn earlier_rule_wins_on_overlapping_match() {
        // "a" (tag 1) is a prefix-accept inside "ab" (tag 2); "a" must win
        // at the state reached after just 'a'.
        let joined = join(vec![(fragment("a"), 1), (fragment("ab"), 2)]);
        let result = subset_construct(&joined);
        assert!(result.dfa.accept_tags.values().any(|&t| t == 1));
        assert!(result.dfa.accept_tags.values().any(|&t| t == 2));
    }

    #[test]
    fn fully_shadowed_rule_is_reported() {
        // tag 2's pattern is identical to tag 1's; tag 1 always wins.
        let joined = join(vec![(fragment("a"), 1), (fragment("a"), 2)]);
        let result = subset_construct(&joined);
        assert_eq!(result.overshadowed.get(&2), Some(&1));
    }

    #[test]
    fn trailing_context_propagates_backtracking() {
        let joined = join(vec![(fragment("ab/cd"), 1)]);
        let result = subset_construct(&joined);
        assert!(!result.dfa.backtracking.is_empty());
    }
}
