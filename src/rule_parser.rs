//! Rule-file parser: turns rule-file text into a [`Rule`] list.
//!
//! Grounded on `examples/original_source/src/klex/RuleParser.cc`: a
//! character-at-a-time cursor (`consume_char`/`consume_token`/
//! `consume_sp`/`consume_any_sp`, `#`-comment skipping in `consume_space`),
//! a ref-rule dictionary keyed by name with `{name}` textual substitution,
//! and continuation lines (`|`) appended to the previously parsed rule.
//! The `<*>` wildcard-condition rewrite, not present in this particular
//! original file, is applied once parsing completes.

use crate::rule::{Rule, FIRST_USER_TAG, IGNORE_TAG, INITIAL_CONDITION};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// A syntactic error raised while parsing a rule file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{line}:{column}: unexpected {actual}, expected '{expected}'")]
    UnexpectedChar {
        line: u32,
        column: u32,
        actual: CharOrEof,
        expected: char,
    },
    #[error("{line}:{column}: unexpected token, expected {expected}")]
    UnexpectedToken {
        line: u32,
        column: u32,
        expected: String,
    },
    #[error("{line}:{column}: invalid rule option '{option}'")]
    InvalidRuleOption {
        line: u32,
        column: u32,
        option: String,
    },
    #[error("{line}:{column}: duplicate rule '{name}', first defined at {first_line}:{first_column}")]
    DuplicateRule {
        line: u32,
        column: u32,
        name: String,
        first_line: u32,
        first_column: u32,
    },
    #[error("{line}:{column}: ref rule '{name}' may not declare start conditions")]
    InvalidRefRuleWithConditions { line: u32, column: u32, name: String },
}

/// Either a concrete character or end-of-input, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharOrEof {
    Char(char),
    Eof,
}

impl std::fmt::Display for CharOrEof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharOrEof::Char(c) => write!(f, "'{}'", c),
            CharOrEof::Eof => write!(f, "end of input"),
        }
    }
}

type RResult<T> = Result<T, RuleError>;

#[derive(Clone)]
enum LastRule {
    None,
    Concrete(usize),
    Ref(String),
}

/// Parses the full rule-file grammar.
pub struct RuleParser {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    ref_rules: HashMap<String, Rule>,
    last: LastRule,
    next_tag: i32,
}

impl RuleParser {
    pub fn new(input: &str) -> Self {
        RuleParser {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            ref_rules: HashMap::new(),
            last: LastRule::None,
            next_tag: FIRST_USER_TAG,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn consume_expected(&mut self, expected: char) -> RResult<()> {
        let (line, column) = (self.line, self.column);
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(RuleError::UnexpectedChar {
                line,
                column,
                actual: CharOrEof::Char(c),
                expected,
            }),
            None => Err(RuleError::UnexpectedChar {
                line,
                column,
                actual: CharOrEof::Eof,
                expected,
            }),
        }
    }

    // skips space/tabs/CR and '#'-comments until LF or EOF
    fn consume_space(&mut self) {
        loop {
            match self.current() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while !self.eof() && self.current() != Some('\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn consume_sp(&mut self) {
        while matches!(self.current(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    fn consume_any_sp(&mut self) {
        while matches!(self.current(), Some(' ') | Some('\t') | Some('\n')) {
            self.advance();
        }
    }

    fn consume_assoc(&mut self) -> RResult<()> {
        self.consume_expected(':')?;
        self.consume_expected(':')?;
        self.consume_expected('=')
    }

    fn consume_token(&mut self) -> RResult<String> {
        match self.current() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => {
                return Err(RuleError::UnexpectedToken {
                    line: self.line,
                    column: self.column,
                    expected: "an identifier".to_string(),
                })
            }
        }
        let mut s = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(s)
    }

    /// Parses the whole rule file into a list of rules.
    pub fn parse(mut self) -> RResult<Vec<Rule>> {
        let mut rules = Vec::new();
        loop {
            self.consume_space();
            if self.eof() {
                break;
            } else if self.current() == Some('\n') {
                self.advance();
            } else {
                self.parse_rule(&mut rules)?;
            }
        }
        expand_wildcard_conditions(&mut rules);
        Ok(rules)
    }

    fn parse_rule(&mut self, rules: &mut Vec<Rule>) -> RResult<()> {
        self.consume_sp();

        if self.current() == Some('|') {
            let last = self.last.clone();
            let has_target = !matches!(last, LastRule::None);
            if has_target {
                self.advance();
                self.consume_sp();
                let pattern = self.parse_expression();
                match last {
                    LastRule::Concrete(idx) => {
                        rules[idx].pattern.push('|');
                        rules[idx].pattern.push_str(&pattern);
                    }
                    LastRule::Ref(name) => {
                        let r = self.ref_rules.get_mut(&name).expect("ref rule must exist");
                        r.pattern.push('|');
                        r.pattern.push_str(&pattern);
                    }
                    LastRule::None => unreachable!(),
                }
                return Ok(());
            }
        }

        // finalize the previous ref-rule now that no further continuation
        // line will extend it
        if let LastRule::Ref(name) = self.last.clone() {
            if let Some(r) = self.ref_rules.get_mut(&name) {
                r.pattern = format!("({})", r.pattern);
            }
        }

        let conditions = self.parse_rule_conditions()?;
        self.consume_sp();
        if !conditions.is_empty() && self.current() == Some('{') {
            self.advance();
            self.consume_any_sp();
            while !self.eof() && self.current() != Some('}') {
                self.parse_basic_rule(rules, conditions.clone())?;
                self.consume_sp();
            }
            self.consume_expected('}')?;
            self.consume_sp();
            if self.current() == Some('\n') {
                self.advance();
            }
            Ok(())
        } else {
            self.parse_basic_rule(rules, conditions)
        }
    }

    // RuleConditionList ::= '<' (TOKEN (',' SP* TOKEN)* | '*') '>'
    fn parse_rule_conditions(&mut self) -> RResult<Vec<String>> {
        if self.current() != Some('<') {
            return Ok(Vec::new());
        }
        self.advance();
        if self.current() == Some('*') {
            self.advance();
            self.consume_expected('>')?;
            return Ok(vec!["*".to_string()]);
        }
        let mut conditions = vec![self.consume_token()?];
        while self.current() == Some(',') {
            self.advance();
            self.consume_sp();
            conditions.push(self.consume_token()?);
        }
        self.consume_expected('>')?;
        Ok(conditions)
    }

    fn parse_basic_rule(&mut self, rules: &mut Vec<Rule>, mut conditions: Vec<String>) -> RResult<()> {
        let begin_line = self.line;
        let begin_column = self.column;

        let name = self.consume_token()?;
        let mut ignore = false;
        let mut is_ref = false;
        if self.current() == Some('(') {
            self.advance();
            let (option_line, option_column) = (self.line, self.column);
            let option = self.consume_token()?;
            self.consume_expected(')')?;
            match option.as_str() {
                "ignore" => ignore = true,
                "ref" => is_ref = true,
                _ => {
                    return Err(RuleError::InvalidRuleOption {
                        line: option_line,
                        column: option_column,
                        option,
                    })
                }
            }
        }
        self.consume_sp();
        self.consume_assoc()?;
        self.consume_sp();
        let line = self.line;
        let column = self.column;
        let pattern = self.parse_expression();
        self.consume_expected('\n')?;

        let tag = if ignore || is_ref {
            IGNORE_TAG
        } else if let Some(existing) = rules.iter().find(|r| r.name == name) {
            existing.tag
        } else {
            let t = self.next_tag;
            self.next_tag += 1;
            t
        };

        if is_ref && !conditions.is_empty() {
            return Err(RuleError::InvalidRefRuleWithConditions {
                line: begin_line,
                column: begin_column,
                name,
            });
        }

        if conditions.is_empty() {
            conditions.push(INITIAL_CONDITION.to_string());
        }
        conditions.sort();

        if !is_ref {
            if let Some(existing) = rules.iter().find(|r| r.name == name) {
                return Err(RuleError::DuplicateRule {
                    line,
                    column,
                    name,
                    first_line: existing.line,
                    first_column: existing.column,
                });
            }
            rules.push(Rule {
                line,
                column,
                tag,
                conditions,
                name,
                pattern,
                is_ref: false,
                starts_with_bol: false,
            });
            self.last = LastRule::Concrete(rules.len() - 1);
        } else if let Some(existing) = self.ref_rules.get(&name) {
            return Err(RuleError::DuplicateRule {
                line,
                column,
                name,
                first_line: existing.line,
                first_column: existing.column,
            });
        } else {
            self.ref_rules.insert(
                name.clone(),
                Rule {
                    line,
                    column,
                    tag,
                    conditions: Vec::new(),
                    name: name.clone(),
                    pattern,
                    is_ref: true,
                    starts_with_bol: false,
                },
            );
            self.last = LastRule::Ref(name);
        }
        Ok(())
    }

    /// Reads the rest of the line, trimmed of trailing whitespace, then
    /// substitutes every `{name}` occurrence of an already-parsed ref rule.
    fn parse_expression(&mut self) -> String {
        let mut buf = String::new();
        let mut last_graph = 0usize;
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.advance();
            buf.push(c);
            if !c.is_whitespace() {
                last_graph = buf.chars().count();
            }
        }
        let mut pattern: String = buf.chars().take(last_graph).collect();

        for (name, rule) in self.ref_rules.iter() {
            let marker = format!("{{{}}}", name);
            if pattern.contains(&marker) {
                pattern = pattern.replace(&marker, &rule.pattern);
            }
        }
        pattern
    }
}

fn expand_wildcard_conditions(rules: &mut [Rule]) {
    let mut all: BTreeSet<String> = rules
        .iter()
        .flat_map(|r| r.conditions.iter().cloned())
        .filter(|c| c != "*")
        .collect();
    if all.is_empty() {
        all.insert(INITIAL_CONDITION.to_string());
    }
    for r in rules.iter_mut() {
        if r.conditions.len() == 1 && r.conditions[0] == "*" {
            r.conditions = all.iter().cloned().collect();
        }
    }
}

/// Parses `input` (full rule-file text) into a [`Rule`] list.
pub fn parse_rules(input: &str) -> RResult<Vec<Rule>> {
    RuleParser::new(input).parse()
}
