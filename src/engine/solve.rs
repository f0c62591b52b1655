//! Solver sessions for path conditions
//!
//! Every query uses a fresh solver; nothing is shared between branches.

use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use z3::{Params, SatResult, Solver};

use crate::engine::result::{Witness, WitnessValue};
use crate::symbolic::{Constraint, SymbolicVariable};

/// Configuration for the SMT solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Timeout per query (None means no timeout)
    pub timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SolverConfig {
    /// Create a config with no timeout
    pub fn no_timeout() -> Self {
        Self { timeout: None }
    }

    /// Create a config with a specific timeout in seconds
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            timeout: Some(Duration::from_secs(secs)),
        }
    }
}

/// Create a Z3 solver with the given configuration
pub fn create_solver_with_config(cfg: &SolverConfig) -> Solver {
    let solver = Solver::new();
    if let Some(timeout) = cfg.timeout {
        let mut params = Params::new();
        params.set_u32("timeout", timeout.as_millis().min(u32::MAX as u128) as u32);
        solver.set_params(&params);
    }
    solver
}

/// Outcome of solving one path condition
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// Satisfiable, with values for the tracked variables the model constrains
    Satisfiable(Vec<Witness>),
    Infeasible,
    /// Timeout or incomplete theory; treated as not satisfiable
    Unknown,
}

fn solver_for(constraints: &[Constraint], cfg: &SolverConfig) -> Solver {
    let solver = create_solver_with_config(cfg);
    for constraint in constraints {
        solver.assert(constraint.term());
    }
    solver
}

/// Check a constraint store without extracting a model
pub fn check_feasible(constraints: &[Constraint], cfg: &SolverConfig) -> SatResult {
    solver_for(constraints, cfg).check()
}

/// Solve a terminal path and read witnesses for its tracked variables
pub fn solve_path<'a>(
    constraints: &[Constraint],
    tracked: impl IntoIterator<Item = &'a Rc<SymbolicVariable>>,
    cfg: &SolverConfig,
) -> PathOutcome {
    let solver = solver_for(constraints, cfg);
    match solver.check() {
        SatResult::Unsat => PathOutcome::Infeasible,
        SatResult::Unknown => {
            debug!(
                reason = %solver.get_reason_unknown().unwrap_or_default(),
                "solver returned unknown"
            );
            PathOutcome::Unknown
        }
        SatResult::Sat => {
            let Some(model) = solver.get_model() else {
                return PathOutcome::Unknown;
            };
            let mut witnesses = Vec::new();
            for variable in tracked {
                let Some(value) = model.eval(variable.term(), false) else {
                    continue;
                };
                // Without model completion an unconstrained constant evaluates to itself
                if value.to_string() == variable.term().to_string() {
                    continue;
                }
                let value = match value.as_rational() {
                    Some((numerator, denominator)) => WitnessValue::Rational {
                        numerator,
                        denominator,
                    },
                    None => WitnessValue::Text(value.to_string()),
                };
                witnesses.push(Witness {
                    name: variable.name().to_string(),
                    value,
                });
            }
            PathOutcome::Satisfiable(witnesses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{ConstraintKind, Operand, Predicate, RelOp};

    fn compare(op: RelOp, name: &str, value: f64) -> Constraint {
        Constraint::from_predicate(
            ConstraintKind::Relational,
            Predicate::Compare {
                op,
                lhs: Operand::Variable(name.into()),
                rhs: Operand::Number(value),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_satisfiable_path_has_witness() {
        let a = Rc::new(SymbolicVariable::new("a", true));
        let constraints = vec![compare(RelOp::Gt, "a", 10.0), compare(RelOp::Lt, "a", 12.0)];
        match solve_path(&constraints, [&a], &SolverConfig::default()) {
            PathOutcome::Satisfiable(witnesses) => {
                assert_eq!(witnesses.len(), 1);
                let value = witnesses[0].value.as_f64().unwrap();
                assert!(value > 10.0 && value < 12.0);
            }
            other => panic!("expected satisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_contradiction_is_infeasible() {
        let a = Rc::new(SymbolicVariable::new("a", true));
        let constraints = vec![compare(RelOp::Gt, "a", 10.0), compare(RelOp::Le, "a", 10.0)];
        assert_eq!(
            solve_path(&constraints, [&a], &SolverConfig::no_timeout()),
            PathOutcome::Infeasible
        );
        assert_eq!(
            check_feasible(&constraints, &SolverConfig::default()),
            SatResult::Unsat
        );
    }

    #[test]
    fn test_unconstrained_variable_is_skipped() {
        let a = Rc::new(SymbolicVariable::new("a", true));
        let b = Rc::new(SymbolicVariable::new("b", true));
        let constraints = vec![compare(RelOp::Eq, "a", 2.5)];
        match solve_path(&constraints, [&a, &b], &SolverConfig::default()) {
            PathOutcome::Satisfiable(witnesses) => {
                assert_eq!(witnesses.len(), 1);
                assert_eq!(witnesses[0].name, "a");
                assert_eq!(witnesses[0].value.as_f64(), Some(2.5));
            }
            other => panic!("expected satisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_store_is_satisfiable() {
        let outcome = solve_path(&[], std::iter::empty(), &SolverConfig::with_timeout_secs(5));
        assert_eq!(outcome, PathOutcome::Satisfiable(Vec::new()));
    }
}
