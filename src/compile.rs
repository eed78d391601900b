//! Top-level compile pipeline: rule-file text in, a [`LexerDef`] out.
//!
//! Mirrors `ScannerBuilder::build`'s staging (parse -> per-mode NFA -> DFA
//! -> minimize -> assemble), generalized from a single flat mode list to
//! named-start-condition grouping.

use crate::errors::{LexError, LexErrorKind, Result};
use crate::internal::dfa::subset_construct;
use crate::internal::minimizer::minimize;
use crate::internal::multi_dfa::compose;
use crate::internal::nfa::{from_expr, join};
use crate::internal::regex_parser;
use crate::lexer_def::LexerDef;
use crate::rule::Rule;
use crate::rule_parser::parse_rules;
use log::trace;
use std::collections::HashMap;

/// Knobs for [`compile`]. `Default` matches what a caller wants almost
/// always: a minimal table.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Run Hopcroft minimization on every per-condition DFA before they're
    /// joined. Disabling this is only useful to inspect or benchmark the
    /// unminimized table; the runtime behaves identically either way.
    pub minimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { minimize: true }
    }
}

/// Compiles rule-file text into a [`LexerDef`] ready to drive a
/// [`crate::runtime::Lexer`].
pub fn compile(rule_file: &str, options: CompileOptions) -> Result<LexerDef> {
    let mut rules = parse_rules(rule_file)?;
    trace!("Parsed {} rules", rules.len());

    for rule in &mut rules {
        let expr = regex_parser::parse(&rule.pattern, rule.line, rule.column)?;
        rule.starts_with_bol = expr.starts_with_bol();
    }

    let mut tag_names = HashMap::new();
    for rule in &rules {
        if !rule.is_ignored() {
            tag_names.insert(rule.tag, rule.name.clone());
        }
    }

    let conditions = group_by_condition(&rules);
    trace!("Grouped into {} start condition(s)", conditions.len());

    let multi = compose(&conditions, |group| build_dfa(group, options.minimize))
        .map_err(|overshadowed| LexError::new(LexErrorKind::Overshadow(overshadowed)))?;
    trace!("Composed multi-DFA with {} states", multi.states.len());

    Ok(LexerDef::from_multi_dfa(multi, tag_names))
}

/// Groups rules by the start conditions they belong to, in first-seen
/// condition order; a rule declared under several conditions appears once
/// in each group.
fn group_by_condition(rules: &[Rule]) -> Vec<(String, Vec<Rule>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Rule>> = HashMap::new();

    for rule in rules {
        for condition in &rule.conditions {
            if !groups.contains_key(condition) {
                order.push(condition.clone());
            }
            groups.entry(condition.clone()).or_default().push(rule.clone());
        }
    }

    order
        .into_iter()
        .map(|name| {
            let rules = groups.remove(&name).unwrap_or_default();
            (name, rules)
        })
        .collect()
}

/// Builds one condition's DFA: parse every rule's pattern, join into a
/// single NFA, run subset construction, minimize if asked, and reject the
/// group if any rule tag is fully shadowed.
fn build_dfa(
    rules: &[Rule],
    should_minimize: bool,
) -> std::result::Result<crate::internal::dfa::Dfa, Vec<(i32, i32)>> {
    let fragments: Vec<_> = rules
        .iter()
        .map(|rule| {
            let expr = regex_parser::parse(&rule.pattern, rule.line, rule.column)
                .expect("pattern already validated during the parse pass")
                .desugar_eol();
            (from_expr(&expr), rule.tag)
        })
        .collect();

    let result = subset_construct(&join(fragments));
    trace!("Subset construction produced {} states", result.dfa.states.len());
    if !result.overshadowed.is_empty() {
        return Err(result.overshadowed.into_iter().collect());
    }

    Ok(if should_minimize {
        minimize(&result.dfa)
    } else {
        result.dfa
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_rule_file() {
        let def = compile("NUM::=[0-9]+\nWS(ignore)::=[ \\t]+\n", CompileOptions::default())
            .expect("valid rule file compiles");
        assert!(def.initial_state("INITIAL").is_some());
        assert!(!def.contains_bol);
        assert_eq!(def.tag_names.len(), 1);
    }

    #[test]
    fn reports_fully_shadowed_rules() {
        let src = "A::=a\nB::=a\n";
        let err = compile(src, CompileOptions::default()).unwrap_err();
        assert!(matches!(*err.source, LexErrorKind::Overshadow(_)));
    }

    #[test]
    fn start_conditions_produce_independent_machines() {
        let src = "<STRING>A::=a\nB::=b\n";
        let def = compile(src, CompileOptions::default()).unwrap();
        assert!(def.initial_state("INITIAL").is_some());
        assert!(def.initial_state("STRING").is_some());
    }
}
