mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use treelox::diagnostics::Diagnostics;
use treelox::interpreter::output::Output;
use treelox::{Config, Session};

fn bench_interpreter(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        for (mode, use_resolver) in [("resolved", true), ("dynamic", false)] {
            let config = Config {
                use_resolver,
                ..Config::default()
            };
            c.bench_function(&format!("interpreter_{mode}_{label}"), |b| {
                b.iter(|| {
                    let mut session = Session::with_output(config, Output::buffer());
                    session
                        .run(black_box(&source), &mut Diagnostics::new())
                        .expect("run");
                    black_box(session.take_output());
                })
            });
        }
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
