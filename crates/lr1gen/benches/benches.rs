use criterion::{criterion_group, criterion_main, Criterion};
use lr1gen::{grammar::Grammar, lr1::LR1Automaton, table::ParseTable};
use std::{env, path::PathBuf};

criterion_main!(benches);
criterion_group!(benches, bench_mfield, bench_arithmetic);

fn bench_mfield(c: &mut Criterion) {
    bench_pipeline(c, "mfield");
}

fn bench_arithmetic(c: &mut Criterion) {
    bench_pipeline(c, "arithmetic");
}

fn bench_pipeline(c: &mut Criterion, grammar_name: &str) {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    let grammar =
        Grammar::from_file(project_root.join(format!("tests/{}.g4", grammar_name))).unwrap();

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("automaton", |b| {
        b.iter(|| LR1Automaton::generate(&grammar));
    });
    group.bench_function("tables", |b| {
        let automaton = LR1Automaton::generate(&grammar);
        b.iter(|| ParseTable::generate(&grammar, &automaton).unwrap());
    });
    group.finish();
}
