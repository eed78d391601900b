//! End-to-end tests driving the whole pipeline: rule-file text in,
//! recognized token sequence out.

use lexc::{compile, CompileOptions, LexErrorKind, Lexer, LexerDef, Tag};

fn def(rule_file: &str) -> LexerDef {
    compile(rule_file, CompileOptions::default()).expect("rule file compiles")
}

fn tag_of(def: &LexerDef, name: &str) -> Tag {
    *def.tag_names
        .iter()
        .find(|(_, n)| n.as_str() == name)
        .map(|(tag, _)| tag)
        .unwrap_or_else(|| panic!("no rule named {name}"))
}

const SCENARIO_12_RULES: &str = concat!(
    "Space(ignore)::=[ \\t\\n]+\n",
    "Eof::=<<EOF>>\n",
    "ABBA::=abba\n",
    "AB_CD::=ab/cd\n",
    "CD::=cd\n",
    "CDEF::=cdef\n",
    "XAnyLine::=x.*\n",
    "EOL_LF::=eol$\n",
);

#[test]
fn maximal_munch_and_trailing_context_pick_the_longest_rule() {
    let def = def(SCENARIO_12_RULES);
    let lexer = Lexer::new(&def, "abba abcdef");

    let abba = tag_of(&def, "ABBA");
    let ab_cd = tag_of(&def, "AB_CD");
    let cdef = tag_of(&def, "CDEF");
    let eof = tag_of(&def, "Eof");

    let tags: Vec<Tag> = lexer.map(|r| r.unwrap().tag).collect();
    assert_eq!(tags, vec![abba, ab_cd, cdef, eof]);
}

#[test]
fn trailing_context_before_a_line_break_reports_offsets() {
    let def = def(SCENARIO_12_RULES);
    let lexer = Lexer::new(&def, "abba eol\nabba");

    let abba = tag_of(&def, "ABBA");
    let eol_lf = tag_of(&def, "EOL_LF");
    let eof = tag_of(&def, "Eof");

    let tokens: Vec<_> = lexer.map(|r| r.unwrap()).collect();
    let tags: Vec<Tag> = tokens.iter().map(|t| t.tag).collect();
    let offsets: Vec<(usize, usize)> = tokens
        .iter()
        .map(|t| (t.offset.start, t.offset.end))
        .collect();

    assert_eq!(tags, vec![abba, eol_lf, abba, eof]);
    assert_eq!(offsets, vec![(0, 4), (5, 8), (9, 13), (13, 13)]);
}

const SCENARIO_3_RULES: &str = concat!(
    "Space(ignore)::=[ \\t]+\n",
    "Pragma::=^pragma\n",
    "Test::=test\n",
    "Unknown::=.\n",
    "Eof::=<<EOF>>\n",
);

#[test]
fn begin_of_line_anchor_only_matches_at_line_start() {
    let def = def(SCENARIO_3_RULES);
    let pragma = tag_of(&def, "Pragma");
    let test = tag_of(&def, "Test");
    let unknown = tag_of(&def, "Unknown");
    let eof = tag_of(&def, "Eof");

    let at_start = Lexer::new(&def, "pragma test");
    let tags: Vec<Tag> = at_start.map(|r| r.unwrap().tag).collect();
    assert_eq!(tags, vec![pragma, test, eof]);

    let not_at_start = Lexer::new(&def, "test pragma");
    let mut expected = vec![test];
    expected.extend(std::iter::repeat(unknown).take(6));
    expected.push(eof);
    let tags: Vec<Tag> = not_at_start.map(|r| r.unwrap().tag).collect();
    assert_eq!(tags, expected);
}

#[test]
fn a_rule_fully_shadowed_by_an_earlier_one_is_reported() {
    let src = "Identifier::=[a-z][a-z0-9]*\nTrueLiteral::=\"true\"\n";
    let err = compile(src, CompileOptions::default()).unwrap_err();
    match *err.source {
        LexErrorKind::Overshadow(pairs) => {
            assert_eq!(pairs, vec![(2, 1)]);
        }
        other => panic!("expected Overshadow, got {other:?}"),
    }
}

#[test]
fn a_ref_rule_builds_a_single_token_per_dotted_quad() {
    let src = concat!(
        "Byte(ref)::=[0-9]+\n",
        "IPv4Literal::={Byte}(\\.{Byte}){3}\n",
        "Space(ignore)::=[ ]+\n",
    );
    let def = def(src);
    let lexer = Lexer::new(&def, "0.0.0.0 4.2.2.1");
    let lexemes: Vec<Vec<u8>> = lexer.map(|r| r.unwrap().lexeme).collect();
    assert_eq!(lexemes, vec![b"0.0.0.0".to_vec(), b"4.2.2.1".to_vec()]);
}

#[test]
fn an_optional_trailing_alternative_matches_both_shapes() {
    let src = "Test::=aa(bb|)\nSpace(ignore)::=[ ]+\n";
    let def = def(src);
    let test = tag_of(&def, "Test");
    let lexer = Lexer::new(&def, "aabb aa aabb");
    let tokens: Vec<_> = lexer.map(|r| r.unwrap()).collect();
    assert_eq!(tokens.len(), 3);
    assert!(tokens.iter().all(|t| t.tag == test));
    assert_eq!(tokens[0].lexeme, b"aabb");
    assert_eq!(tokens[1].lexeme, b"aa");
    assert_eq!(tokens[2].lexeme, b"aabb");
}
