//! Thompson construction: expression tree → ε-NFA, and the join of every
//! rule's fragment into one automaton under a synthetic root state.
//!
//! Grounded on `examples/original_source/src/klex/ThompsonConstruct.cc` for
//! the combinator shapes (`concatenate`, `alternate`, `optional`,
//! `recurring`, `positive`, `times`, `repeat`) and on
//! `examples/original_source/src/klex/MultiDFA.cc` for the synthetic-root
//! join, applied here one layer earlier (at the NFA instead of the DFA) so
//! a single flat array stands in for a `Vec<Nfa>`-plus-virtual-union design.

use super::ids::{StateId, StateIdBase};
use super::regex_ast::{Expr, INFINITE};
use crate::symbol::{Symbol, SymbolSet};
use rustc_hash::FxHashMap as HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct NfaState {
    pub(crate) epsilon: Vec<StateId>,
    pub(crate) transitions: Vec<(Symbol, StateId)>,
}

/// A single-pattern fragment under construction. `start` and `accept` are
/// always distinct; every combinator consumes its operand(s) and returns a
/// fragment with the same property.
#[derive(Debug, Clone)]
pub(crate) struct Nfa {
    states: Vec<NfaState>,
    start: StateId,
    accept: StateId,
    backtrack: HashMap<StateId, StateId>,
}

impl Nfa {
    fn with_states(states: Vec<NfaState>, start: StateId, accept: StateId) -> Nfa {
        Nfa {
            states,
            start,
            accept,
            backtrack: HashMap::default(),
        }
    }

    fn epsilon_fragment() -> Nfa {
        let mut states = vec![NfaState::default(), NfaState::default()];
        states[0].epsilon.push(StateId::new(1));
        Nfa::with_states(states, StateId::new(0), StateId::new(1))
    }

    fn symbol_fragment(sym: Symbol) -> Nfa {
        let mut states = vec![NfaState::default(), NfaState::default()];
        states[0].transitions.push((sym, StateId::new(1)));
        Nfa::with_states(states, StateId::new(0), StateId::new(1))
    }

    fn set_fragment(set: &SymbolSet) -> Nfa {
        let mut states = vec![NfaState::default(), NfaState::default()];
        for b in set.iter() {
            states[0].transitions.push((b as Symbol, StateId::new(1)));
        }
        Nfa::with_states(states, StateId::new(0), StateId::new(1))
    }

    fn new_state(&mut self) -> StateId {
        let id = StateId::new(self.states.len() as StateIdBase);
        self.states.push(NfaState::default());
        id
    }

    /// Re-bases every state id owned by this fragment by `offset`. Never
    /// pointer-patching: ids are plain array indices, so merging two
    /// fragments is just "shift one, then extend the other's array".
    fn shift_ids(&mut self, offset: StateIdBase) {
        for state in &mut self.states {
            for e in &mut state.epsilon {
                *e = *e + offset;
            }
            for (_, t) in &mut state.transitions {
                *t = *t + offset;
            }
        }
        self.start = self.start + offset;
        self.accept = self.accept + offset;
        self.backtrack = self
            .backtrack
            .drain()
            .map(|(k, v)| (k + offset, v + offset))
            .collect();
    }

    pub(crate) fn concat(mut self, mut rhs: Nfa) -> Nfa {
        let offset = self.states.len() as StateIdBase;
        rhs.shift_ids(offset);
        self.states.extend(rhs.states);
        self.states[self.accept].epsilon.push(rhs.start);
        self.backtrack.extend(rhs.backtrack);
        Nfa {
            states: self.states,
            start: self.start,
            accept: rhs.accept,
            backtrack: self.backtrack,
        }
    }

    pub(crate) fn alternate(mut self, mut rhs: Nfa) -> Nfa {
        let offset = self.states.len() as StateIdBase;
        rhs.shift_ids(offset);
        self.states.extend(rhs.states);
        let new_start = self.new_state();
        let new_end = self.new_state();
        self.states[new_start].epsilon.push(self.start);
        self.states[new_start].epsilon.push(rhs.start);
        self.states[self.accept].epsilon.push(new_end);
        self.states[rhs.accept].epsilon.push(new_end);
        self.backtrack.extend(rhs.backtrack);
        Nfa {
            states: self.states,
            start: new_start,
            accept: new_end,
            backtrack: self.backtrack,
        }
    }

    /// `r{0,1}`: new start ε→(r.start, new end); r.accept ε→new end.
    pub(crate) fn optional(mut self) -> Nfa {
        let new_start = self.new_state();
        let new_end = self.new_state();
        self.states[new_start].epsilon.push(self.start);
        self.states[new_start].epsilon.push(new_end);
        self.states[self.accept].epsilon.push(new_end);
        Nfa {
            states: self.states,
            start: new_start,
            accept: new_end,
            backtrack: self.backtrack,
        }
    }

    /// `r{0,∞}`, the classical five-state Kleene star wrap.
    pub(crate) fn star(mut self) -> Nfa {
        let new_start = self.new_state();
        let new_end = self.new_state();
        self.states[new_start].epsilon.push(self.start);
        self.states[new_start].epsilon.push(new_end);
        self.states[self.accept].epsilon.push(self.start);
        self.states[self.accept].epsilon.push(new_end);
        Nfa {
            states: self.states,
            start: new_start,
            accept: new_end,
            backtrack: self.backtrack,
        }
    }

    /// `r{1,∞}` = `r · r*`.
    pub(crate) fn plus(self) -> Nfa {
        let tail = self.clone().star();
        self.concat(tail)
    }

    /// `n`-fold concatenation of clones; `times(0)` matches the empty
    /// string, matching `r{0,0}`.
    pub(crate) fn times(self, n: u32) -> Nfa {
        if n == 0 {
            return Nfa::epsilon_fragment();
        }
        let mut result = self.clone();
        for _ in 1..n {
            result = result.concat(self.clone());
        }
        result
    }

    /// `r{m,n}` with `m < n`: `r{m}` alternated with `r{m+1}, …, r{n}`.
    pub(crate) fn repeat(self, min: u32, max: u32) -> Nfa {
        let base = self.clone();
        let mut result = base.clone().times(min);
        for n in (min + 1)..=max {
            result = result.alternate(base.clone().times(n));
        }
        result
    }

    /// Trailing context `r / s`: concatenate with an ε-edge and record
    /// `backtrack[s.accept] = r.accept`, so the runtime can roll input back
    /// to the `r`/`s` split point after matching the full `rs`.
    pub(crate) fn lookahead(mut self, mut rhs: Nfa) -> Nfa {
        let r_accept = self.accept;
        let offset = self.states.len() as StateIdBase;
        rhs.shift_ids(offset);
        let s_accept = rhs.accept;
        self.states.extend(rhs.states);
        self.states[r_accept].epsilon.push(rhs.start);
        self.backtrack.extend(rhs.backtrack);
        self.backtrack.insert(s_accept, r_accept);
        Nfa {
            states: self.states,
            start: self.start,
            accept: s_accept,
            backtrack: self.backtrack,
        }
    }
}

fn build_closure(sub: &Expr, min: u32, max: u32) -> Nfa {
    let base = from_expr(sub);
    match (min, max) {
        (0, 1) => base.optional(),
        (0, INFINITE) => base.star(),
        (1, INFINITE) => base.plus(),
        (m, n) if m == n => base.times(m),
        (m, INFINITE) => base.clone().times(m).concat(base.star()),
        (m, n) => base.repeat(m, n),
    }
}

/// Recursively builds one pattern's NFA fragment from its expression tree.
/// `Expr::EndOfLine` must already have been rewritten by
/// [`Expr::desugar_eol`]; encountering one here is a builder bug, not a
/// user-facing error.
pub(crate) fn from_expr(expr: &Expr) -> Nfa {
    match expr {
        Expr::Empty => Nfa::epsilon_fragment(),
        Expr::Character(sym) => Nfa::symbol_fragment(*sym),
        Expr::CharacterClass(set) => Nfa::set_fragment(set),
        Expr::Dot => Nfa::set_fragment(&SymbolSet::dot()),
        // BOL is a zero-width assertion; the multi-DFA composer decides
        // which rules get restricted to the line-start variant.
        Expr::BeginOfLine => Nfa::epsilon_fragment(),
        Expr::EndOfLine => unreachable!("EndOfLine must be desugared before NFA construction"),
        Expr::EndOfFile => Nfa::symbol_fragment(crate::symbol::END_OF_FILE),
        Expr::Concatenation(l, r) => from_expr(l).concat(from_expr(r)),
        Expr::Alternation(l, r) => from_expr(l).alternate(from_expr(r)),
        Expr::Closure(sub, min, max) => build_closure(sub, *min, *max),
        Expr::LookAhead(l, r) => from_expr(l).lookahead(from_expr(r)),
    }
}

/// One joined NFA: every rule's fragment hangs off a synthetic root state
/// `0` by a real ε-edge (not the virtual per-NFA union a
/// `MultiPatternNfa` computes on the fly). `εclose({0})` is configuration
/// `q₀` for subset construction.
#[derive(Debug)]
pub(crate) struct JoinedNfa {
    pub(crate) states: Vec<NfaState>,
    pub(crate) start: StateId,
    pub(crate) accept_tags: HashMap<StateId, i32>,
    pub(crate) backtrack: HashMap<StateId, StateId>,
}

impl JoinedNfa {
    /// Every symbol named by some non-ε transition, deduplicated.
    pub(crate) fn alphabet(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .states
            .iter()
            .flat_map(|s| s.transitions.iter().map(|(sym, _)| *sym))
            .collect();
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }

    /// ε-closure of a configuration: every state reachable from `from`
    /// using only ε-edges, `from` included.
    pub(crate) fn epsilon_closure(&self, from: &[StateId]) -> Vec<StateId> {
        let mut seen: std::collections::BTreeSet<StateId> = from.iter().copied().collect();
        let mut stack: Vec<StateId> = from.to_vec();
        while let Some(s) = stack.pop() {
            for &next in &self.states[s].epsilon {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// `δ(configuration, symbol)`: every state directly reachable from a
    /// member of `configuration` by a transition labeled `symbol`.
    pub(crate) fn mv(&self, configuration: &[StateId], symbol: Symbol) -> Vec<StateId> {
        let mut out = Vec::new();
        for &s in configuration {
            for &(sym, target) in &self.states[s].transitions {
                if sym == symbol {
                    out.push(target);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Joins `fragments` (one per rule, already tagged) into a single
/// [`JoinedNfa`] under a fresh synthetic root.
pub(crate) fn join(fragments: Vec<(Nfa, i32)>) -> JoinedNfa {
    let mut states: Vec<NfaState> = vec![NfaState::default()];
    let mut accept_tags = HashMap::default();
    let mut backtrack = HashMap::default();
    for (mut frag, tag) in fragments {
        let offset = states.len() as StateIdBase;
        frag.shift_ids(offset);
        states[0].epsilon.push(frag.start);
        accept_tags.insert(frag.accept, tag);
        backtrack.extend(frag.backtrack);
        states.extend(frag.states);
    }
    JoinedNfa {
        states,
        start: StateId::new(0),
        accept_tags,
        backtrack,
    }
}
