#![allow(dead_code)]
use std::path::Path;

use test_support::bench_cases;
use treelox::ast::{NodeIds, Stmt};
use treelox::diagnostics::Diagnostics;
use treelox::{lexer, parser};

/// `(label, source)` for every fixture with benchmarking enabled.
pub fn workloads() -> Vec<(String, String)> {
    let cases = bench_cases(Path::new("tests/programs")).unwrap_or_else(|err| panic!("load bench cases: {err:#}"));
    cases
        .into_iter()
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn parse_program(label: &str, source: &str) -> Vec<Stmt> {
    let mut diagnostics = Diagnostics::new();
    let tokens = lexer::tokenize(source, &mut diagnostics).unwrap_or_else(|err| panic!("tokenize {label}: {err}"));
    parser::parse_tokens(tokens, &mut NodeIds::new(), &mut diagnostics)
        .unwrap_or_else(|err| panic!("parse {label}: {err}"))
}
