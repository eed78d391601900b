//! The runtime matcher: drives a compiled [`LexerDef`] over a byte input,
//! one token at a time.
//!
//! Grounded on `examples/original_source/src/klex/Lexer.h` and
//! `Lexer-inl.h`'s `recognizeOne`: a `BadState` sentinel seeded onto the
//! state stack before scanning starts, the stack cleared every time an
//! accept state is reached (so it only ever holds the states since the
//! last accept), and two backtrack loops on `ErrorState` -- first back to
//! the right-most accept state, then (if that state is a backtrack
//! source) further back to the recorded anchor. The raw pointer rewinding
//! of the original becomes popping bytes off of an owned `Vec<u8>` input
//! buffer here.

use crate::errors::{LexError, LexErrorKind, Result};
use crate::lexer_def::{LexerDef, MachineId};
use crate::rule::{Tag, IGNORE_TAG, INITIAL_CONDITION};
use crate::span::Span;
use log::trace;

/// Sentinel pushed onto the state stack before scanning begins; popped
/// past by the first backtrack loop if not even one symbol was
/// recognized as part of any accept state's prefix.
const BAD_STATE: u32 = u32::MAX;

/// Anything that can be turned into the byte buffer a [`Lexer`] scans.
/// Accepts owned and borrowed strings and byte slices alike, the way the
/// `ScannerBuilder` accepts either a `&str` or a pre-split byte
/// buffer.
pub struct LexerInput(Vec<u8>);

impl From<&str> for LexerInput {
    fn from(s: &str) -> Self {
        LexerInput(s.as_bytes().to_vec())
    }
}
impl From<String> for LexerInput {
    fn from(s: String) -> Self {
        LexerInput(s.into_bytes())
    }
}
impl From<&[u8]> for LexerInput {
    fn from(b: &[u8]) -> Self {
        LexerInput(b.to_vec())
    }
}
impl From<Vec<u8>> for LexerInput {
    fn from(b: Vec<u8>) -> Self {
        LexerInput(b)
    }
}

/// One recognized token, as yielded by [`Lexer`]'s `Iterator` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// The rule tag that matched.
    pub tag: Tag,
    /// The matched bytes.
    pub lexeme: Vec<u8>,
    /// The byte range of the match within the input.
    pub offset: Span,
}

/// Drives a [`LexerDef`] over an input buffer, recognizing one token at a
/// time with flex-style maximal-munch matching and trailing-context
/// backtracking.
///
/// Single-threaded and synchronous: each instance owns its own cursor
/// (offset, current machine, `is_bol`) over a `LexerDef` it only ever
/// reads, matching the division in `examples/jsinger67-scnr`'s
/// `src/scanner.rs` between an immutable compiled core and a small owned
/// mutable cursor.
pub struct Lexer<'d> {
    def: &'d LexerDef,
    input: Vec<u8>,
    pos: usize,
    is_bol: bool,
    machine: String,
    word: Vec<u8>,
    token: Tag,
    last_offset: Span,
    /// Set once the `Iterator` impl has given a `<<EOF>>` rule its one
    /// chance to match at end of input; stops `next` from trying again.
    at_eof: bool,
}

impl<'d> Lexer<'d> {
    /// Creates a matcher over `def`, starting on `INITIAL` at the first
    /// byte of `source`.
    pub fn new(def: &'d LexerDef, source: impl Into<LexerInput>) -> Self {
        let mut lexer = Lexer {
            def,
            input: Vec::new(),
            pos: 0,
            is_bol: true,
            machine: INITIAL_CONDITION.to_string(),
            word: Vec::new(),
            token: IGNORE_TAG,
            last_offset: Span::new(0, 0),
            at_eof: false,
        };
        lexer.open(source);
        lexer
    }

    /// Rewinds the matcher onto a fresh input, keeping the compiled table
    /// and current machine selection.
    pub fn open(&mut self, source: impl Into<LexerInput>) {
        self.input = source.into().0;
        self.pos = 0;
        self.is_bol = true;
        self.word.clear();
        self.last_offset = Span::new(0, 0);
        self.at_eof = false;
    }

    /// Switches the active start condition.
    pub fn set_machine(&mut self, id: MachineId) -> Result<()> {
        let name = self
            .def
            .initial_states
            .iter()
            .find(|(_, &state)| state == id.0)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                LexError::new(LexErrorKind::InvalidMachineConfig(format!(
                    "no start condition has initial state {id}"
                )))
            })?;
        self.machine = name;
        trace!("Set lexer machine to {}", self.machine);
        Ok(())
    }

    /// The `INITIAL` machine's id.
    pub fn default_machine(&self) -> MachineId {
        self.def
            .initial_state(INITIAL_CONDITION)
            .expect("every LexerDef has an INITIAL machine")
    }

    /// The most recently recognized tag, including ignored ones if
    /// [`Lexer::recognize_one`] was called directly.
    pub fn token(&self) -> Tag {
        self.token
    }

    /// The bytes of the most recently recognized token.
    pub fn word(&self) -> &[u8] {
        &self.word
    }

    /// The byte range `(start, end)` of the most recently recognized
    /// token within the input.
    pub fn offset(&self) -> (usize, usize) {
        (self.last_offset.start, self.last_offset.end)
    }

    /// Whether `tag` is the most recently recognized token's tag.
    pub fn is_token(&self, tag: Tag) -> bool {
        self.token == tag
    }

    fn current_initial_state(&self) -> Result<u32> {
        let bol_name = format!("{}{}", self.machine, crate::internal::multi_dfa::BOL_SUFFIX);
        let name = if self.is_bol && self.def.contains_bol && self.def.initial_states.contains_key(&bol_name)
        {
            bol_name
        } else {
            self.machine.clone()
        };
        self.def.initial_state(&name).map(|m| m.0).ok_or_else(|| {
            LexError::new(LexErrorKind::InvalidMachineConfig(format!(
                "unknown start condition '{}'",
                self.machine
            )))
        })
    }

    fn next_symbol(&mut self) -> i32 {
        if self.pos >= self.input.len() {
            crate::symbol::END_OF_FILE as i32
        } else {
            let b = self.input[self.pos];
            self.pos += 1;
            b as i32
        }
    }

    /// Recognizes exactly one token, ignored or not, per the six-step
    /// algorithm the original `recognizeOne` implements.
    pub fn recognize_one(&mut self) -> Result<Tag> {
        let start = self.pos;
        self.word.clear();

        let mut state = self.current_initial_state()?;
        // Each frame is the state the loop was in before reading one
        // symbol, paired with whether that symbol was a real byte (so a
        // backtrack through it must also roll back `word`/`pos`) or the
        // end-of-file sentinel (which consumed nothing to roll back).
        let mut stack: Vec<(u32, bool)> = vec![(BAD_STATE, false)];

        while state != crate::lexer_def::ERROR_SENTINEL {
            let symbol = self.next_symbol();
            let is_real_byte = symbol != crate::symbol::END_OF_FILE as i32;
            if is_real_byte {
                self.word.push(symbol as u8);
            }

            if self.def.accept_tag(state).is_some() {
                stack.clear();
            }
            stack.push((state, is_real_byte));

            match self.def.step(state, symbol) {
                Some(next) => state = next,
                // The failing symbol (and the state it was read from) stay
                // on `word`/`stack`; the backtrack loop below unwinds them
                // uniformly along with everything else since the last
                // accept, exactly as the byte that triggers the original's
                // `ErrorState` is unwound by its own backtrack loop rather
                // than rolled back here.
                None => state = crate::lexer_def::ERROR_SENTINEL,
            }
        }

        let mut pop = |stack: &mut Vec<(u32, bool)>, word: &mut Vec<u8>, pos: &mut usize| {
            let (popped, was_real_byte) = stack.pop().unwrap_or((BAD_STATE, false));
            if was_real_byte {
                if *pos > 0 {
                    *pos -= 1;
                }
                word.pop();
            }
            popped
        };

        while state != BAD_STATE && self.def.accept_tag(state).is_none() {
            state = pop(&mut stack, &mut self.word, &mut self.pos);
        }

        if let Some(target) = self.def.backtrack_anchor(state) {
            let accept = state;
            while !stack.is_empty() && state != target {
                state = pop(&mut stack, &mut self.word, &mut self.pos);
            }
            state = accept;
        }

        let tag = self
            .def
            .accept_tag(state)
            .ok_or_else(|| LexError::new(LexErrorKind::NoMatch { offset: start }))?;

        self.token = tag;
        self.last_offset = Span::new(start, self.pos);
        trace!("Recognized tag {} at {}..{}", tag, start, self.pos);
        Ok(tag)
    }

    /// Recognizes tokens until one isn't tagged [`IGNORE_TAG`], updating
    /// `is_bol` from the last byte consumed.
    pub fn recognize(&mut self) -> Result<Tag> {
        loop {
            let tag = self.recognize_one()?;
            self.is_bol = self.word.last() == Some(&b'\n');
            if tag != IGNORE_TAG {
                return Ok(tag);
            }
        }
    }
}

impl<'d> Iterator for Lexer<'d> {
    type Item = Result<TokenInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_eof {
            return None;
        }
        if self.pos >= self.input.len() {
            // One last attempt so a `<<EOF>>` rule gets to match before
            // the iterator ends; if the table has no such rule this just
            // fails to recognize and the iterator ends quietly instead.
            self.at_eof = true;
            return match self.recognize() {
                Ok(tag) => Some(Ok(TokenInfo {
                    tag,
                    lexeme: self.word.clone(),
                    offset: self.last_offset,
                })),
                Err(_) => None,
            };
        }
        match self.recognize() {
            Ok(tag) => Some(Ok(TokenInfo {
                tag,
                lexeme: self.word.clone(),
                offset: self.last_offset,
            })),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, CompileOptions};

    fn def(src: &str) -> LexerDef {
        compile(src, CompileOptions::default()).unwrap()
    }

    #[test]
    fn recognizes_a_single_token() {
        let def = def("NUM::=[0-9]+\n");
        let mut lexer = Lexer::new(&def, "123");
        assert_eq!(lexer.recognize().unwrap(), 1);
        assert_eq!(lexer.word(), b"123");
        assert_eq!(lexer.offset(), (0, 3));
    }

    #[test]
    fn skips_ignored_tokens() {
        let def = def("NUM::=[0-9]+\nWS(ignore)::=[ ]+\n");
        let mut lexer = Lexer::new(&def, "12 34");
        assert_eq!(lexer.recognize().unwrap(), 1);
        assert_eq!(lexer.word(), b"12");
        assert_eq!(lexer.recognize().unwrap(), 1);
        assert_eq!(lexer.word(), b"34");
    }

    #[test]
    fn maximal_munch_prefers_the_longest_match() {
        let def = def("IF::=if\nID::=[a-z]+\n");
        let mut lexer = Lexer::new(&def, "iffy");
        assert_eq!(lexer.recognize().unwrap(), 2);
        assert_eq!(lexer.word(), b"iffy");
    }

    #[test]
    fn iterator_yields_token_info_until_input_is_exhausted() {
        let def = def("ID::=[a-z]+\nWS(ignore)::=[ ]+\n");
        let lexer = Lexer::new(&def, "ab cd");
        let tokens: Vec<_> = lexer.map(|r| r.unwrap().lexeme).collect();
        assert_eq!(tokens, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    #[test]
    fn iterator_gives_an_eof_rule_one_chance_to_match_at_the_end() {
        let def = def("ID::=[a-z]+\nEof::=<<EOF>>\n");
        let lexer = Lexer::new(&def, "ab");
        let tags: Vec<_> = lexer.map(|r| r.unwrap().tag).collect();
        assert_eq!(tags, vec![1, 2]);
    }

    #[test]
    fn trailing_context_rolls_back_to_the_right_of_the_split() {
        let def = def("ABCD::=ab/cd\nCD::=cd\n");
        let mut lexer = Lexer::new(&def, "abcd");
        assert_eq!(lexer.recognize().unwrap(), 1);
        assert_eq!(lexer.word(), b"ab");
        assert_eq!(lexer.offset(), (0, 2));
        assert_eq!(lexer.recognize().unwrap(), 2);
        assert_eq!(lexer.word(), b"cd");
    }

    #[test]
    fn fails_with_offset_when_nothing_matches() {
        let def = def("NUM::=[0-9]+\n");
        let mut lexer = Lexer::new(&def, "abc");
        let err = lexer.recognize_one().unwrap_err();
        assert!(matches!(*err.source, LexErrorKind::NoMatch { offset: 0 }));
    }
}
