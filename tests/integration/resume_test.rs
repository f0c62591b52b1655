use diffsym::cache::{read_cache, resume};
use diffsym::engine::{EngineConfig, ExplorationReport, Explorer, ResultRecord};
use diffsym::output::RunDirectory;
use diffsym::syntax::{diff_programs, parse_program, read_diff, write_diff, Statement};
use diffsym::SymexError;

use crate::common::execute_with_witnesses;

const OLD: &str = r#"
let a = new SymbolicNumber();
let b = new SymbolicNumber();
let scale = 2;
if (a > 10) {
    if (b < a) {
        throw Error("b under a");
    } else {
        let marker = 1;
    }
    if (b == 50) {
        throw Error("fifty");
    }
} else {
    if (b > 0) {
        throw Error("positive b");
    }
}
"#;

fn edited_leaf() -> String {
    OLD.replace(
        "let marker = 1;",
        "let marker = 1;\n        if (b > 60) { throw Error(\"over sixty\"); }",
    )
}

fn cached_run(source: &str) -> ExplorationReport {
    Explorer::new(EngineConfig::default().with_write_cache(true))
        .run(parse_program(source).unwrap())
        .unwrap()
}

fn diff(old: &str, new: &str) -> Vec<Statement> {
    diff_programs(&parse_program(old).unwrap(), &parse_program(new).unwrap())
}

fn terminals<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> Vec<String> {
    let mut found: Vec<String> = records
        .into_iter()
        .map(|record| record.terminal.to_string())
        .collect();
    found.sort();
    found
}

fn value(record: &ResultRecord, name: &str) -> f64 {
    record.witness(name).and_then(|v| v.as_f64()).unwrap()
}

#[test]
fn test_resume_matches_full_rerun_on_shared_prefix() {
    let new = edited_leaf();
    let cache = cached_run(OLD).cache;
    let resumed = resume(&diff(OLD, &new), &cache, EngineConfig::default(), None).unwrap();

    let full = Explorer::new(EngineConfig::default())
        .run(parse_program(&new).unwrap())
        .unwrap();
    // Paths through the alternate of `b < a` inside `a > 10`
    let prefix: Vec<&ResultRecord> = full
        .results
        .iter()
        .filter(|record| value(record, "a") > 10.0 && value(record, "b") >= value(record, "a"))
        .collect();

    assert_eq!(terminals(&resumed.results), terminals(prefix));
    assert!(resumed
        .results
        .iter()
        .any(|record| record.terminal.to_string().contains("over sixty")));
    assert!(resumed.statistics.contexts_visited < full.statistics.contexts_visited);
}

#[test]
fn test_resumed_witnesses_replay_on_edited_program() {
    let new = edited_leaf();
    let program = parse_program(&new).unwrap();
    let resumed = resume(
        &diff(OLD, &new),
        &cached_run(OLD).cache,
        EngineConfig::default(),
        None,
    )
    .unwrap();
    assert!(!resumed.results.is_empty());
    for record in &resumed.results {
        assert_eq!(execute_with_witnesses(&program, record), record.terminal);
    }
}

#[test]
fn test_top_level_edit_resumes_from_root() {
    let new = OLD.replace("let scale = 2;", "let scale = 3;");
    let resumed = resume(&diff(OLD, &new), &cached_run(OLD).cache, EngineConfig::default(), None)
        .unwrap();
    let full = Explorer::new(EngineConfig::default())
        .run(parse_program(&new).unwrap())
        .unwrap();
    assert_eq!(terminals(&resumed.results), terminals(&full.results));
}

#[test]
fn test_unknown_conditional_is_a_cache_miss() {
    let other = r#"
let z = new SymbolicNumber();
if (z > 1) { let w = 1; }
"#;
    let edited = other.replace("let w = 1;", "let w = 2;");
    let result = resume(
        &diff(other, &edited),
        &cached_run(OLD).cache,
        EngineConfig::default(),
        None,
    );
    match result {
        Err(SymexError::CacheMiss { location }) => assert!(location.contains("z > 1")),
        other => panic!("expected a cache miss, got {:?}", other.map(|r| r.results)),
    }
}

#[test]
fn test_resume_through_files() {
    let root = tempfile::tempdir().unwrap();
    let mut first = RunDirectory::create(root.path()).unwrap();
    Explorer::new(EngineConfig::default().with_write_cache(true))
        .with_storage(&mut first)
        .run(parse_program(OLD).unwrap())
        .unwrap();
    let cache_path = first.cache_path();
    drop(first);

    let diff_path = root.path().join("edit.diff.jsonl");
    write_diff(&diff_path, &diff(OLD, &edited_leaf())).unwrap();

    let mut second = RunDirectory::create(root.path()).unwrap();
    let report = resume(
        &read_diff(&diff_path).unwrap(),
        &read_cache(&cache_path).unwrap(),
        EngineConfig::default(),
        Some(&mut second),
    )
    .unwrap();
    assert!(second.path().ends_with("run2"));
    assert_eq!(
        diffsym::output::read_results(second.path()).unwrap(),
        report.results
    );
}
