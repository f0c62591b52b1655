//! Per-branch search state

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::symbolic::constraint::{Constraint, ConstraintKind};
use crate::symbolic::variable::SymbolicVariable;
use crate::syntax::Statement;

/// Statements still to interpret plus the path state accumulated so far.
///
/// Constraints are kept in program order. Variables are shared with forked
/// siblings through `Rc`; the stores themselves are copied on fork, so
/// siblings never observe each other's additions.
#[derive(Debug, Clone, Default)]
pub struct SymbolicContext {
    remaining: VecDeque<Statement>,
    constraints: Vec<Constraint>,
    variables: BTreeMap<String, Rc<SymbolicVariable>>,
}

impl SymbolicContext {
    /// Root context for a program
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            remaining: statements.into(),
            ..Default::default()
        }
    }

    /// Context seeded from a cached snapshot
    pub fn from_snapshot(
        statements: Vec<Statement>,
        constraints: Vec<Constraint>,
        variables: BTreeMap<String, Rc<SymbolicVariable>>,
    ) -> Self {
        Self {
            remaining: statements.into(),
            constraints,
            variables,
        }
    }

    /// Add a constraint; an assignment replaces any earlier assignment to the
    /// same variable
    pub fn add_constraint(&mut self, constraint: Constraint) {
        if constraint.kind() == ConstraintKind::Assignment {
            if let Some(target) = constraint.assigned_variable() {
                self.constraints
                    .retain(|existing| existing.assigned_variable() != Some(target));
            }
        }
        self.constraints.push(constraint);
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Rc<SymbolicVariable>> {
        self.variables.get(name)
    }

    /// Add a variable to the store. Redeclaring a name replaces the entry and
    /// drops the old pin.
    pub fn declare_variable(&mut self, variable: SymbolicVariable) -> Rc<SymbolicVariable> {
        let name = variable.name().to_string();
        if self.variables.contains_key(&name) {
            self.constraints
                .retain(|existing| existing.assigned_variable() != Some(name.as_str()));
        }
        let variable = Rc::new(variable);
        self.variables.insert(name, Rc::clone(&variable));
        variable
    }

    /// Independent copy with the same remaining statements and value-copied
    /// stores
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Replace the remaining statements
    pub fn with_remaining(mut self, statements: Vec<Statement>) -> Self {
        self.remaining = statements.into();
        self
    }

    pub fn next_statement(&mut self) -> Option<Statement> {
        self.remaining.pop_front()
    }

    /// Queue statements ahead of the current remainder
    pub fn prepend(&mut self, statements: Vec<Statement>) {
        for statement in statements.into_iter().rev() {
            self.remaining.push_front(statement);
        }
    }

    /// Drain the remaining statements
    pub fn take_remaining(&mut self) -> Vec<Statement> {
        self.remaining.drain(..).collect()
    }

    pub fn remaining(&self) -> &VecDeque<Statement> {
        &self.remaining
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn variables(&self) -> &BTreeMap<String, Rc<SymbolicVariable>> {
        &self.variables
    }

    pub fn tracked_variables(&self) -> impl Iterator<Item = &Rc<SymbolicVariable>> {
        self.variables.values().filter(|variable| variable.is_tracked())
    }
}
