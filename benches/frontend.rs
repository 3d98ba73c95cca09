mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use treelox::ast::NodeIds;
use treelox::diagnostics::Diagnostics;
use treelox::{lexer, parser, resolver};

fn bench_frontend(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        let tokens = lexer::tokenize(&source, &mut Diagnostics::new()).expect("tokenize");
        let statements = common::parse_program(&label, &source);

        c.bench_function(&format!("frontend_tokenize_{label}"), |b| {
            b.iter(|| {
                let out = lexer::tokenize(black_box(&source), &mut Diagnostics::new()).expect("tokenize");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_parse_only_{label}"), |b| {
            b.iter(|| {
                let out = parser::parse_tokens(
                    black_box(tokens.clone()),
                    &mut NodeIds::new(),
                    &mut Diagnostics::new(),
                )
                .expect("parse");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_resolve_only_{label}"), |b| {
            b.iter(|| {
                let out = resolver::resolve(black_box(&statements), &mut Diagnostics::new()).expect("resolve");
                black_box(out);
            })
        });
    }
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
