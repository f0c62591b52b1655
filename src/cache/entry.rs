//! Cache entries: per-context snapshots written during a run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::rc::Rc;

use crate::error::{Result, SymexError};
use crate::symbolic::{Constraint, SymbolicContext, SymbolicVariable};
use crate::syntax::IfStatement;

/// Which branch of a conditional a context runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSide {
    Consequent,
    Alternate,
}

impl fmt::Display for BranchSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchSide::Consequent => write!(f, "consequent"),
            BranchSide::Alternate => write!(f, "alternate"),
        }
    }
}

/// Snapshot of one visited context.
///
/// `last_conditional` is the `if` whose fork produced the context, absent
/// for the program root. `branch` is absent in caches that did not record it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub last_conditional: Option<IfStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchSide>,
    pub constraints: Vec<Constraint>,
    pub variables: BTreeMap<String, Rc<SymbolicVariable>>,
}

impl CacheEntry {
    pub fn snapshot(
        context: &SymbolicContext,
        last_conditional: Option<&IfStatement>,
        branch: Option<BranchSide>,
    ) -> Self {
        Self {
            last_conditional: last_conditional.cloned(),
            branch,
            constraints: context.constraints().to_vec(),
            variables: context.variables().clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.last_conditional.is_none()
    }
}

/// Read every entry of a cache file; blank lines are ignored
pub fn read_cache(path: &Path) -> Result<Vec<CacheEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| SymexError::CorruptCache {
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_program, Expression, Statement};

    fn sample_entry() -> CacheEntry {
        let program = parse_program("if (a > 10) { b = 1; }").unwrap();
        let Statement::IfStatement(conditional) = &program[0] else {
            panic!("expected if");
        };
        let mut context = SymbolicContext::new(Vec::new());
        context.declare_variable(SymbolicVariable::new("a", true));
        context.declare_variable(SymbolicVariable::new("b", true));
        let pin = Constraint::assignment("b", &Expression::number(4.0), &context).unwrap();
        context.add_constraint(pin);
        let test = Constraint::relational(&conditional.test, &context).unwrap();
        context.add_constraint(test.negate());
        CacheEntry::snapshot(&context, Some(conditional), Some(BranchSide::Alternate))
    }

    #[test]
    fn test_entry_json_roundtrip() {
        let entry = sample_entry();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains('\n'));
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.constraints[1].to_string(), "!(a > 10)");
        assert!(!back.is_root());
    }

    #[test]
    fn test_branch_field_is_optional() {
        let json = r#"{"last_conditional":null,"constraints":[],"variables":{}}"#;
        let entry: CacheEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_root());
        assert_eq!(entry.branch, None);
    }

    #[test]
    fn test_read_cache_reports_corrupt_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        let good = serde_json::to_string(&sample_entry()).unwrap();
        std::fs::write(&path, format!("{}\n\n{}\n", good, good)).unwrap();
        assert_eq!(read_cache(&path).unwrap().len(), 2);

        std::fs::write(&path, format!("{}\n{{\"truncated\n", good)).unwrap();
        match read_cache(&path) {
            Err(SymexError::CorruptCache { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt cache, got {:?}", other),
        }
    }
}
