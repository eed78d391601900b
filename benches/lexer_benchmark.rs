use criterion::{criterion_group, criterion_main, Criterion};
use lexc::{compile, CompileOptions, Lexer};

const RULES: &str = concat!(
    "Whitespace(ignore)::=[ \\t\\n]+\n",
    "Number::=[0-9]+\n",
    "Identifier::=[a-zA-Z_][a-zA-Z0-9_]*\n",
    "Assign::==\n",
    "Plus::=\\+\n",
    "Semi::=;\n",
);

const SOURCE: &str = "\
let x = 1;
let y = 2;
let total = x + y + 42;
let another_identifier = total + x + y + 1234567890;
";

fn lexer_benchmark(c: &mut Criterion) {
    let def = compile(RULES, CompileOptions::default()).unwrap();

    c.bench_function("lexer_benchmark", |b| {
        b.iter(|| {
            let lexer = Lexer::new(&def, SOURCE);
            let _tokens: Vec<_> = lexer.collect();
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets = lexer_benchmark
}

criterion_main!(benches);
