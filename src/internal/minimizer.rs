//! Hopcroft-style DFA minimization.
//!
//! No single original source file covers this pass directly; the partition
//! refinement shape follows the same worklist-free "refine until the block
//! count stops growing" idiom as `subset_construct` in [`super::dfa`].

use super::dfa::{Dfa, DfaState};
use super::ids::{StateId, StateIdBase};
use crate::symbol::Symbol;
use log::trace;
use rustc_hash::FxHashMap as HashMap;

/// Minimizes `dfa` in place conceptually, returning a fresh, smaller `Dfa`.
/// Initial partition: one block per distinct (accept-tag, is-backtrack-
/// source) pair. A block is split whenever some input symbol maps its
/// members to states in different blocks; `ErrorState` (no transition)
/// counts as its own target partition. Terminates when no split occurs.
pub(crate) fn minimize(dfa: &Dfa) -> Dfa {
    trace!("Minimize DFA ({} states)", dfa.states.len());
    let n = dfa.states.len();
    if n == 0 {
        return dfa.clone();
    }

    let alphabet: Vec<Symbol> = {
        let mut syms: Vec<Symbol> = dfa
            .states
            .iter()
            .flat_map(|s| s.transitions.keys().copied())
            .collect();
        syms.sort_unstable();
        syms.dedup();
        syms
    };

    let mut partition = initial_partition(dfa, n);

    loop {
        let mut keys: HashMap<(usize, Vec<Option<usize>>), usize> = HashMap::default();
        let mut new_partition = vec![0usize; n];
        for s in 0..n {
            let signature: Vec<Option<usize>> = alphabet
                .iter()
                .map(|sym| {
                    dfa.states[s]
                        .transitions
                        .get(sym)
                        .map(|t| partition[t.as_usize()])
                })
                .collect();
            let key = (partition[s], signature);
            let next = keys.len();
            let block = *keys.entry(key).or_insert(next);
            new_partition[s] = block;
        }

        let old_count = block_count(&partition);
        let new_count = block_count(&new_partition);
        trace!("Partition refined: {} -> {} blocks", old_count, new_count);
        partition = new_partition;
        if new_count == old_count {
            break;
        }
    }

    let minimized = remap(dfa, &partition);
    trace!("Minimized DFA has {} states", minimized.states.len());
    minimized
}

fn initial_partition(dfa: &Dfa, n: usize) -> Vec<usize> {
    let mut keys: HashMap<(Option<i32>, bool), usize> = HashMap::default();
    let mut partition = vec![0usize; n];
    for s in 0..n {
        let id = StateId::new(s as StateIdBase);
        let key = (
            dfa.accept_tags.get(&id).copied(),
            dfa.backtracking.contains_key(&id),
        );
        let next = keys.len();
        let block = *keys.entry(key).or_insert(next);
        partition[s] = block;
    }
    partition
}

fn block_count(partition: &[usize]) -> usize {
    partition.iter().copied().max().map_or(0, |m| m + 1)
}

/// Collapses `dfa` to one state per block. Block `b` becomes state `b`; the
/// block containing the old initial state becomes the new initial; tag and
/// backtrack mappings carry over under the block-to-id remap.
fn remap(dfa: &Dfa, partition: &[usize]) -> Dfa {
    let block_count = block_count(partition);
    let mut states = vec![DfaState::default(); block_count];
    let mut accept_tags = HashMap::default();
    let mut backtracking = HashMap::default();
    let mut done = vec![false; block_count];

    for (s, &block) in partition.iter().enumerate() {
        if done[block] {
            continue;
        }
        done[block] = true;

        let old_id = StateId::new(s as StateIdBase);
        let block_id = StateId::new(block as StateIdBase);

        for (&sym, &target) in &dfa.states[s].transitions {
            let target_block = StateId::new(partition[target.as_usize()] as StateIdBase);
            states[block].transitions.insert(sym, target_block);
        }
        if let Some(&tag) = dfa.accept_tags.get(&old_id) {
            accept_tags.insert(block_id, tag);
        }
        if let Some(&anchor) = dfa.backtracking.get(&old_id) {
            let anchor_block = StateId::new(partition[anchor.as_usize()] as StateIdBase);
            backtracking.insert(block_id, anchor_block);
        }
    }

    let initial = StateId::new(partition[dfa.initial.as_usize()] as StateIdBase);

    Dfa {
        states,
        initial,
        accept_tags,
        backtracking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::dfa::subset_construct;
    use crate::internal::nfa::{from_expr, join};
    use crate::internal::regex_parser;

    fn build(patterns: &[(&str, i32)]) -> Dfa {
        let fragments = patterns
            .iter()
            .map(|(p, tag)| {
                let expr = regex_parser::parse(p, 1, 1).unwrap().desugar_eol();
                (from_expr(&expr), *tag)
            })
            .collect();
        subset_construct(&join(fragments)).dfa
    }

    #[test]
    fn minimization_preserves_accept_tags() {
        let dfa = build(&[("a|b", 1)]);
        let min = minimize(&dfa);
        assert!(min.states.len() <= dfa.states.len());
        assert!(min.accept_tags.values().any(|&t| t == 1));
    }

    #[test]
    fn minimization_never_merges_distinct_tags() {
        let dfa = build(&[("ab", 1), ("ac", 2)]);
        let min = minimize(&dfa);
        let tags: std::collections::HashSet<i32> = min.accept_tags.values().copied().collect();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn redundant_suffix_states_collapse() {
        // "ax" and "bx" share an identical tail; minimization should merge
        // the two post-'x' accept states since they agree on tag and
        // further behavior.
        let dfa = build(&[("ax", 1), ("bx", 1)]);
        let min = minimize(&dfa);
        assert!(min.states.len() < dfa.states.len());
    }
}
