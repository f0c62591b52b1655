//! Structural differ between two program versions
//!
//! The diff is the new program with exactly one statement replaced by a
//! `Divergence` sentinel at the first point where the versions disagree.
//! Conditionals whose tests match are recursed into (consequent first, then
//! alternate) so the sentinel lands at the innermost divergent statement.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SymexError};
use crate::syntax::ast::{IfStatement, Statement};

/// Compare two statement lists and mark the first divergence
pub fn diff_programs(old: &[Statement], new: &[Statement]) -> Vec<Statement> {
    let mut marked = false;
    diff_lists(old, new, &mut marked)
}

fn divergence(old: Option<&Statement>, new: Option<&Statement>) -> Statement {
    Statement::Divergence {
        old: old.map(|s| Box::new(s.clone())),
        new: new.map(|s| Box::new(s.clone())),
    }
}

fn diff_lists(old: &[Statement], new: &[Statement], marked: &mut bool) -> Vec<Statement> {
    let mut out = Vec::with_capacity(new.len());
    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(o), Some(n)) => {
                if *marked {
                    out.push(n.clone());
                    continue;
                }
                match (o, n) {
                    (Statement::IfStatement(oi), Statement::IfStatement(ni)) if oi.test == ni.test => {
                        out.push(Statement::IfStatement(diff_if(oi, ni, marked)));
                    }
                    _ if o == n => out.push(n.clone()),
                    _ => {
                        *marked = true;
                        out.push(divergence(Some(o), Some(n)));
                    }
                }
            }
            (Some(o), None) => {
                if !*marked {
                    *marked = true;
                    out.push(divergence(Some(o), None));
                }
            }
            (None, Some(n)) => {
                if *marked {
                    out.push(n.clone());
                } else {
                    *marked = true;
                    out.push(divergence(None, Some(n)));
                }
            }
            (None, None) => unreachable!("index below the longer length"),
        }
    }
    out
}

fn diff_branch(old: &Statement, new: &Statement, marked: &mut bool) -> Statement {
    let mut body = diff_lists(&old.body(), &new.body(), marked);
    if matches!(new, Statement::BlockStatement { .. }) || body.len() != 1 {
        Statement::BlockStatement { body }
    } else {
        body.remove(0)
    }
}

fn diff_if(old: &IfStatement, new: &IfStatement, marked: &mut bool) -> IfStatement {
    let consequent = diff_branch(&old.consequent, &new.consequent, marked);
    let alternate = match (&old.alternate, &new.alternate) {
        (Some(o), Some(n)) => Some(diff_branch(o, n, marked)),
        (Some(o), None) if !*marked => {
            *marked = true;
            Some(divergence(Some(&**o), None))
        }
        (None, Some(n)) if !*marked => {
            *marked = true;
            Some(divergence(None, Some(&**n)))
        }
        (_, n) => n.as_deref().cloned(),
    };
    IfStatement {
        test: new.test.clone(),
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    }
}

/// Write a diff, one JSON statement per line
pub fn write_diff(path: &Path, diff: &[Statement]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for statement in diff {
        serde_json::to_writer(&mut writer, statement)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a diff written by [`write_diff`]; blank lines are ignored
pub fn read_diff(path: &Path) -> Result<Vec<Statement>> {
    let reader = BufReader::new(File::open(path)?);
    let mut statements = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let statement = serde_json::from_str(&line).map_err(|source| SymexError::CorruptDiff {
            line: index + 1,
            source,
        })?;
        statements.push(statement);
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_program;

    fn count_divergences(statements: &[Statement]) -> usize {
        statements
            .iter()
            .map(|s| match s {
                Statement::Divergence { .. } => 1,
                Statement::BlockStatement { body } => count_divergences(body),
                Statement::IfStatement(i) => {
                    count_divergences(&[(*i.consequent).clone()])
                        + i.alternate
                            .as_ref()
                            .map(|a| count_divergences(&[(**a).clone()]))
                            .unwrap_or(0)
                }
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_identical_programs_have_no_sentinel() {
        let program = parse_program("let a = 1;\nif (a > 0) { a = 2; }").unwrap();
        let diff = diff_programs(&program, &program);
        assert_eq!(diff, program);
    }

    #[test]
    fn test_top_level_change() {
        let old = parse_program("let a = 1;\nlet b = 2;\nlet c = 3;").unwrap();
        let new = parse_program("let a = 1;\nlet b = 5;\nlet c = 3;").unwrap();
        let diff = diff_programs(&old, &new);
        assert_eq!(diff.len(), 3);
        match &diff[1] {
            Statement::Divergence { old: o, new: n } => {
                assert_eq!(o.as_deref(), Some(&old[1]));
                assert_eq!(n.as_deref(), Some(&new[1]));
            }
            other => panic!("expected sentinel, found {:?}", other),
        }
        assert_eq!(diff[2], new[2]);
    }

    #[test]
    fn test_sentinel_is_innermost_and_unique() {
        let old = parse_program(
            "let a = new SymbolicNumber();\nif (a > 1) { if (a < 5) { let x = 1; } else { let y = 2; } }",
        )
        .unwrap();
        let new = parse_program(
            "let a = new SymbolicNumber();\nif (a > 1) { if (a < 5) { let x = 1; } else { let y = 3; } let z = 0; }",
        )
        .unwrap();
        let diff = diff_programs(&old, &new);
        assert_eq!(count_divergences(&diff), 1);

        let outer = diff[1].as_if().unwrap();
        let outer_body = outer.consequent_body();
        let inner = outer_body[0].as_if().unwrap();
        assert!(!inner.consequent.contains_divergence());
        assert!(matches!(
            inner.alternate_body()[0],
            Statement::Divergence { .. }
        ));
        // Statements after the sentinel follow the new program
        assert_eq!(outer_body.len(), 2);
    }

    #[test]
    fn test_changed_test_is_a_divergence_at_the_if() {
        let old = parse_program("if (a > 1) { }").unwrap();
        let new = parse_program("if (a > 2) { }").unwrap();
        let diff = diff_programs(&old, &new);
        assert!(matches!(diff[0], Statement::Divergence { .. }));
    }

    #[test]
    fn test_insertion_and_removal() {
        let old = parse_program("let a = 1;").unwrap();
        let new = parse_program("let a = 1;\nlet b = 2;").unwrap();
        let diff = diff_programs(&old, &new);
        assert!(matches!(
            &diff[1],
            Statement::Divergence { old: None, new: Some(_) }
        ));

        let diff = diff_programs(&new, &old);
        assert!(matches!(
            &diff[1],
            Statement::Divergence { old: Some(_), new: None }
        ));

        let old = parse_program("if (a > 1) { } else { b = 1; }").unwrap();
        let new = parse_program("if (a > 1) { }").unwrap();
        let diff = diff_programs(&old, &new);
        let alternate = diff[0].as_if().unwrap().alternate.as_deref();
        assert!(matches!(
            alternate,
            Some(Statement::Divergence { new: None, .. })
        ));
    }

    #[test]
    fn test_diff_file_roundtrip() {
        let old = parse_program("let a = new SymbolicNumber();\nif (a > 1) { a = 1; }").unwrap();
        let new = parse_program("let a = new SymbolicNumber();\nif (a > 1) { a = 2; }").unwrap();
        let diff = diff_programs(&old, &new);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diff.jsonl");
        write_diff(&path, &diff).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(read_diff(&path).unwrap(), diff);
    }

    #[test]
    fn test_corrupt_diff_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diff.jsonl");
        std::fs::write(&path, "{\"type\":\"EmptyStatement\"}\nnot json\n").unwrap();
        match read_diff(&path) {
            Err(SymexError::CorruptDiff { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt diff, got {:?}", other),
        }
    }
}
