//! Resuming analysis from a cached branch point
//!
//! A diff marks the first statement where an edited program departs from the
//! cached one. The state of a branch depends only on the path leading to it,
//! so the innermost conditional enclosing the divergence can be resumed from
//! its cache entry instead of re-exploring the program from the root.

use tracing::info;

use crate::cache::entry::{BranchSide, CacheEntry};
use crate::engine::{EngineConfig, ExplorationReport, Explorer, Frame};
use crate::error::{Result, SymexError};
use crate::output::RunDirectory;
use crate::symbolic::SymbolicContext;
use crate::syntax::{IfStatement, Statement};

/// Where to restart and what to run from there
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePoint {
    /// Innermost conditional enclosing the divergence, `None` for the root
    pub conditional: Option<IfStatement>,
    pub branch: Option<BranchSide>,
    /// The divergent body resolved to the new program, followed by the
    /// statements after each enclosing conditional
    pub statements: Vec<Statement>,
}

impl ResumePoint {
    fn describe(&self) -> String {
        match (&self.conditional, self.branch) {
            (Some(conditional), Some(side)) => {
                format!("conditional `if ({})` ({})", conditional.test, side)
            }
            (Some(conditional), None) => format!("conditional `if ({})`", conditional.test),
            (None, _) => "the program root".to_string(),
        }
    }
}

/// Replace every sentinel by its new side
pub fn resolve_divergence(statements: &[Statement]) -> Vec<Statement> {
    statements.iter().flat_map(resolve_statement).collect()
}

fn resolve_statement(statement: &Statement) -> Vec<Statement> {
    match statement {
        Statement::Divergence { new, .. } => new
            .as_deref()
            .map(resolve_statement)
            .unwrap_or_default(),
        Statement::BlockStatement { body } => vec![Statement::BlockStatement {
            body: resolve_divergence(body),
        }],
        Statement::IfStatement(conditional) => vec![Statement::IfStatement(resolve_if(conditional))],
        other => vec![other.clone()],
    }
}

fn resolve_branch(branch: &Statement) -> Statement {
    let mut resolved = resolve_statement(branch);
    if resolved.len() == 1 {
        resolved.remove(0)
    } else {
        Statement::BlockStatement { body: resolved }
    }
}

fn resolve_if(conditional: &IfStatement) -> IfStatement {
    IfStatement {
        test: conditional.test.clone(),
        consequent: Box::new(resolve_branch(&conditional.consequent)),
        alternate: conditional
            .alternate
            .as_deref()
            .map(|alternate| Box::new(resolve_branch(alternate))),
    }
}

/// Find the innermost conditional enclosing the divergence. Consequents are
/// searched before alternates.
pub fn locate_resume_point(diff: &[Statement]) -> ResumePoint {
    locate(diff, &[]).unwrap_or_else(|| ResumePoint {
        conditional: None,
        branch: None,
        statements: resolve_divergence(diff),
    })
}

/// `None` when the divergence sits directly in `list` (or nowhere)
fn locate(list: &[Statement], continuation: &[Statement]) -> Option<ResumePoint> {
    for (index, statement) in list.iter().enumerate() {
        if !statement.contains_divergence() {
            continue;
        }
        let mut rest = resolve_divergence(&list[index + 1..]);
        rest.extend_from_slice(continuation);

        match statement {
            Statement::IfStatement(conditional) => {
                let branches = [
                    (BranchSide::Consequent, Some(conditional.consequent.as_ref())),
                    (BranchSide::Alternate, conditional.alternate.as_deref()),
                ];
                for (side, branch) in branches {
                    let Some(branch) = branch.filter(|b| b.contains_divergence()) else {
                        continue;
                    };
                    let body = branch.body();
                    if let Some(point) = locate(&body, &rest) {
                        return Some(point);
                    }
                    let mut statements = resolve_divergence(&body);
                    statements.extend(rest);
                    return Some(ResumePoint {
                        conditional: Some(resolve_if(conditional)),
                        branch: Some(side),
                        statements,
                    });
                }
            }
            Statement::BlockStatement { body } => return locate(body, &rest),
            _ => return None,
        }
    }
    None
}

/// First entry recorded for the resume point's conditional and branch.
/// Identical tests at different locations are indistinguishable here.
pub fn find_entry<'a>(entries: &'a [CacheEntry], point: &ResumePoint) -> Result<&'a CacheEntry> {
    let found = match &point.conditional {
        None => entries.iter().find(|entry| entry.is_root()),
        Some(conditional) => entries.iter().find(|entry| {
            let same_test = entry
                .last_conditional
                .as_ref()
                .is_some_and(|cached| cached.test == conditional.test);
            let same_side = match (entry.branch, point.branch) {
                (Some(cached), Some(wanted)) => cached == wanted,
                _ => true,
            };
            same_test && same_side
        }),
    };
    found.ok_or_else(|| SymexError::CacheMiss {
        location: point.describe(),
    })
}

/// Resume exploration of an edited program from a prior run's cache
pub fn resume(
    diff: &[Statement],
    entries: &[CacheEntry],
    config: EngineConfig,
    storage: Option<&mut RunDirectory>,
) -> Result<ExplorationReport> {
    let point = locate_resume_point(diff);
    let entry = find_entry(entries, &point)?;
    info!(
        location = %point.describe(),
        constraints = entry.constraints.len(),
        statements = point.statements.len(),
        "resuming from cache entry"
    );

    let frame = Frame {
        context: SymbolicContext::from_snapshot(
            point.statements,
            entry.constraints.clone(),
            entry.variables.clone(),
        ),
        last_conditional: entry.last_conditional.clone(),
        branch: entry.branch,
    };
    let explorer = Explorer::new(config);
    match storage {
        Some(storage) => explorer.with_storage(storage).explore(frame),
        None => explorer.explore(frame),
    }
}
