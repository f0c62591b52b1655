use diffsym::engine::{
    EngineConfig, Explorer, FeasibilityCheck, SearchStrategy, Terminal, UnsupportedPolicy,
};
use diffsym::generate::{generate, GeneratorConfig};
use diffsym::output::{read_results, RunDirectory};
use diffsym::syntax::parse_program;
use diffsym::SymexError;

use crate::common::{count_paths, execute_with_witnesses};

const LADDER: &str = r#"
let x = new SymbolicNumber();
let y = new SymbolicNumber();
let limit = 100;
if (x > limit) {
    if (y <= x) {
        throw Error("y below x");
    } else {
        y = 300;
    }
} else {
    if (x === 7) {
        throw Error("seven");
    }
}
if (y < 0) {
    throw Error("negative y");
}
"#;

#[test]
fn test_throw_and_end_witnesses() {
    let program =
        parse_program(r#"let a = new SymbolicNumber(); if (a > 10) { throw Error("x") } else { }"#)
            .unwrap();
    let report = Explorer::new(EngineConfig::default()).run(program).unwrap();

    assert_eq!(report.results.len(), 2);
    for record in &report.results {
        let a = record.witness("a").and_then(|v| v.as_f64()).unwrap();
        match &record.terminal {
            Terminal::ReachedThrow { detail } => {
                assert_eq!(detail, "Error(\"x\")");
                assert!(a > 10.0);
            }
            Terminal::ReachedEnd => assert!(a <= 10.0),
        }
    }
}

#[test]
fn test_pinned_variable_prunes_throw() {
    let program = parse_program(r#"let a = 5; if (a > 10) { throw Error("x") }"#).unwrap();
    let report = Explorer::new(EngineConfig::default()).run(program).unwrap();
    assert_eq!(report.throws().count(), 0);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].terminal, Terminal::ReachedEnd);
}

#[test]
fn test_witnesses_replay_their_paths() {
    let program = parse_program(LADDER).unwrap();
    let report = Explorer::new(EngineConfig::default())
        .run(program.clone())
        .unwrap();

    assert!(report.throws().count() >= 3);
    for record in &report.results {
        assert_eq!(
            execute_with_witnesses(&program, record),
            record.terminal,
            "witnesses of `{}` took another path",
            record
        );
    }
}

#[test]
fn test_every_path_is_a_terminal() {
    let program = parse_program(LADDER).unwrap();
    let report = Explorer::new(EngineConfig::default())
        .run(program.clone())
        .unwrap();
    let stats = &report.statistics;
    assert_eq!(stats.terminals, count_paths(&program) as u64);
    assert_eq!(stats.solver_queries, stats.terminals);
    assert_eq!(
        stats.satisfiable + stats.infeasible + stats.unknown,
        stats.solver_queries
    );
    assert_eq!(stats.results, report.results.len() as u64);
}

#[test]
fn test_generated_programs_are_sound() {
    for seed in 0..4 {
        let generated = generate(&GeneratorConfig::default().with_seed(seed).with_max_depth(2));
        let report = Explorer::new(EngineConfig::default())
            .run(generated.program.clone())
            .unwrap();
        assert_eq!(
            report.statistics.terminals,
            count_paths(&generated.program) as u64
        );
        for record in &report.results {
            assert_eq!(execute_with_witnesses(&generated.program, record), record.terminal);
        }
    }
}

#[test]
fn test_strategies_agree() {
    let program = parse_program(LADDER).unwrap();
    let mut terminals = Vec::new();
    for strategy in [SearchStrategy::DepthFirst, SearchStrategy::BreadthFirst] {
        for feasibility in [FeasibilityCheck::Lazy, FeasibilityCheck::Eager] {
            let config = EngineConfig::default()
                .with_strategy(strategy)
                .with_feasibility(feasibility);
            let report = Explorer::new(config).run(program.clone()).unwrap();
            let mut found: Vec<String> = report
                .results
                .iter()
                .map(|record| record.terminal.to_string())
                .collect();
            found.sort();
            terminals.push(found);
        }
    }
    assert!(terminals.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_unsupported_statement_policy() {
    let source = r#"
let a = new SymbolicNumber();
while (a > 0) { a = 0; }
if (a > 1) { throw Error("after loop") }
"#;
    let program = parse_program(source).unwrap();
    let rejected = Explorer::new(EngineConfig::default()).run(program.clone());
    assert!(matches!(
        rejected,
        Err(SymexError::UnsupportedStatement { .. })
    ));

    let skipped = Explorer::new(EngineConfig::default().with_unsupported(UnsupportedPolicy::Skip))
        .run(program)
        .unwrap();
    assert_eq!(skipped.throws().count(), 1);
}

#[test]
fn test_results_land_in_run_directory() {
    let root = tempfile::tempdir().unwrap();
    let mut run = RunDirectory::create(root.path()).unwrap();
    let report = Explorer::new(EngineConfig::default().with_write_cache(true))
        .with_storage(&mut run)
        .run(parse_program(LADDER).unwrap())
        .unwrap();

    assert_eq!(read_results(run.path()).unwrap(), report.results);
    let cached = diffsym::cache::read_cache(&run.cache_path()).unwrap();
    assert_eq!(cached, report.cache);
    assert_eq!(cached.len() as u64, report.statistics.contexts_visited);
}
