//! Symbolic state: variables, constraints and per-branch contexts

pub mod constraint;
pub mod context;
pub mod variable;

pub use constraint::{to_rational, Constraint, ConstraintKind, Operand, Predicate, RelOp};
pub use context::SymbolicContext;
pub use variable::SymbolicVariable;
