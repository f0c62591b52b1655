use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PROGRAM: &str = r#"
let a = new SymbolicNumber();
if (a > 10) {
    let step = 1;
    throw Error("x");
} else {
    let step = 2;
}
"#;

fn diffsym(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diffsym"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute diffsym")
}

fn assert_success(output: &Output) -> String {
    if !output.status.success() {
        panic!(
            "Command failed with status: {:?}\nstderr: {}\nstdout: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_run_reports_results() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("program.js"), PROGRAM).unwrap();

    let stdout = assert_success(&diffsym(&["run", "program.js", "--write-cache"], dir.path()));
    assert!(stdout.contains("Run directory"));
    assert!(stdout.contains("reached-throw (Error(\"x\"))"));
    assert!(stdout.contains("reached-end"));

    let run = dir.path().join("results").join("run1");
    assert!(run.join("1.json").exists());
    assert!(run.join("2.json").exists());
    assert!(run.join("cache.jsonl").exists());
}

#[test]
fn test_parse_error_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.js"), "let a = ;").unwrap();

    let output = diffsym(&["run", "broken.js"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_diff_then_resume() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("old.js"), PROGRAM).unwrap();
    fs::write(
        dir.path().join("new.js"),
        PROGRAM.replace("let step = 2;", "let step = 2;\n    throw Error(\"y\");"),
    )
    .unwrap();

    assert_success(&diffsym(
        &["run", "old.js", "--write-cache", "--output", "out"],
        dir.path(),
    ));
    assert_success(&diffsym(
        &["diff", "old.js", "new.js", "--output", "edit.jsonl"],
        dir.path(),
    ));
    let stdout = assert_success(&diffsym(
        &[
            "resume",
            "--cache",
            "out/run1/cache.jsonl",
            "--diff",
            "edit.jsonl",
            "--output",
            "out",
        ],
        dir.path(),
    ));

    assert!(stdout.contains("run2"));
    assert!(stdout.contains("reached-throw (Error(\"y\"))"));
    assert!(!stdout.contains("Error(\"x\")"));
}

#[test]
fn test_generate_writes_program_pair() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(&diffsym(
        &["generate", "--seed", "7", "--output", "gen", "--name", "sample"],
        dir.path(),
    ));
    let gen = dir.path().join("gen");
    for file in ["sample.js", "sample.edited.js", "sample.stats.json"] {
        assert!(gen.join(file).exists(), "missing {}", file);
    }

    // The generated program is explorable as written
    assert_success(&diffsym(&["run", "gen/sample.js", "--output", "gen"], dir.path()));
}
