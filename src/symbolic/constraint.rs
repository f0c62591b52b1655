//! Constraint construction and negation
//!
//! A constraint pairs a serializable [`Predicate`] with the solver term it
//! denotes. The predicate is what cache snapshots store; the term is rebuilt
//! from it on load, so a constraint read back from disk is indistinguishable
//! from the one the engine built.

use serde::{Deserialize, Serialize};
use std::fmt;
use z3::ast::{Bool, Real};

use crate::error::{Result, SymexError};
use crate::symbolic::context::SymbolicContext;
use crate::syntax::{BinaryOperator, Expression};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// Path condition from an `if` test
    Relational,
    /// Pin of a variable to its most recently assigned value
    Assignment,
}

/// Supported relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl RelOp {
    /// Map an equality or relational operator; `!==` has no mapping
    pub fn from_binary(operator: BinaryOperator) -> Option<Self> {
        match operator {
            BinaryOperator::Eq | BinaryOperator::StrictEq => Some(RelOp::Eq),
            BinaryOperator::Ne => Some(RelOp::Ne),
            BinaryOperator::Gt => Some(RelOp::Gt),
            BinaryOperator::Ge => Some(RelOp::Ge),
            BinaryOperator::Lt => Some(RelOp::Lt),
            BinaryOperator::Le => Some(RelOp::Le),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
        }
    }

    fn apply(&self, lhs: &Real, rhs: &Real) -> Bool {
        match self {
            RelOp::Eq => lhs.eq(rhs),
            RelOp::Ne => lhs.eq(rhs).not(),
            RelOp::Gt => lhs.gt(rhs),
            RelOp::Ge => lhs.ge(rhs),
            RelOp::Lt => lhs.lt(rhs),
            RelOp::Le => lhs.le(rhs),
        }
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operand {
    Variable(String),
    Number(f64),
}

impl Operand {
    fn to_term(&self) -> Result<Real> {
        match self {
            Operand::Variable(name) => Ok(Real::new_const(name.as_str())),
            Operand::Number(value) => {
                let (numerator, denominator) = to_rational(*value)?;
                Ok(Real::from_rational(numerator, denominator))
            }
        }
    }

    fn is_variable(&self) -> bool {
        matches!(self, Operand::Variable(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Serializable description of a constraint's boolean term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    Compare {
        op: RelOp,
        lhs: Operand,
        rhs: Operand,
    },
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn to_term(&self) -> Result<Bool> {
        match self {
            Predicate::Compare { op, lhs, rhs } => Ok(op.apply(&lhs.to_term()?, &rhs.to_term()?)),
            Predicate::Not(inner) => Ok(inner.to_term()?.not()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Predicate::Not(inner) => write!(f, "!({})", inner),
        }
    }
}

/// Exact rational for a literal, read from its shortest round-trip decimal
/// form. Fails when the numerator or denominator does not fit in an `i64`.
pub fn to_rational(value: f64) -> Result<(i64, i64)> {
    let unsupported = || SymexError::UnsupportedLiteral {
        literal: value.to_string(),
    };
    if !value.is_finite() {
        return Err(unsupported());
    }
    // `Display` for f64 never uses exponent notation
    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut numerator: i64 = 0;
    for digit in whole.chars().chain(fraction.chars()) {
        let digit = digit.to_digit(10).ok_or_else(unsupported)?;
        numerator = numerator
            .checked_mul(10)
            .and_then(|n| n.checked_add(i64::from(digit)))
            .ok_or_else(unsupported)?;
    }
    let scale = u32::try_from(fraction.len()).map_err(|_| unsupported())?;
    let denominator = 10_i64.checked_pow(scale).ok_or_else(unsupported)?;

    if value.is_sign_negative() {
        numerator = -numerator;
    }
    Ok((numerator, denominator))
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "ConstraintRecord", into = "ConstraintRecord")]
pub struct Constraint {
    kind: ConstraintKind,
    predicate: Predicate,
    term: Bool,
}

#[derive(Serialize, Deserialize)]
struct ConstraintRecord {
    kind: ConstraintKind,
    predicate: Predicate,
}

impl TryFrom<ConstraintRecord> for Constraint {
    type Error = SymexError;

    fn try_from(record: ConstraintRecord) -> Result<Self> {
        Constraint::from_predicate(record.kind, record.predicate)
    }
}

impl From<Constraint> for ConstraintRecord {
    fn from(constraint: Constraint) -> Self {
        ConstraintRecord {
            kind: constraint.kind,
            predicate: constraint.predicate,
        }
    }
}

/// Resolve an operand against the variable store: a declared variable or a
/// numeric literal, nothing else
fn resolve_operand(expression: &Expression, context: &SymbolicContext) -> Option<Operand> {
    match expression {
        Expression::Identifier { name } => context
            .lookup_variable(name)
            .map(|variable| Operand::Variable(variable.name().to_string())),
        other => other.as_number().map(Operand::Number),
    }
}

impl Constraint {
    pub fn from_predicate(kind: ConstraintKind, predicate: Predicate) -> Result<Self> {
        let term = predicate.to_term()?;
        Ok(Self {
            kind,
            predicate,
            term,
        })
    }

    /// Build the path condition of an `if` test. Operand order is kept as
    /// written, so `5 > a` constrains `a` from above.
    pub fn relational(test: &Expression, context: &SymbolicContext) -> Result<Self> {
        let Expression::Binary {
            operator,
            left,
            right,
        } = test
        else {
            return Err(SymexError::UnsupportedTest {
                test: test.to_string(),
            });
        };
        let op = RelOp::from_binary(*operator).ok_or_else(|| SymexError::UnsupportedOperator {
            operator: operator.symbol().to_string(),
            expression: test.to_string(),
        })?;

        let non_symbolic = || SymexError::NonSymbolicComparison {
            expression: test.to_string(),
        };
        let lhs = resolve_operand(left, context).ok_or_else(non_symbolic)?;
        let rhs = resolve_operand(right, context).ok_or_else(non_symbolic)?;
        if !lhs.is_variable() && !rhs.is_variable() {
            return Err(non_symbolic());
        }

        Self::from_predicate(ConstraintKind::Relational, Predicate::Compare { op, lhs, rhs })
    }

    /// Build the pin `target == value` for a plain assignment or an
    /// initialized declaration. A variable on the right stays live: after
    /// `a = b; b = 3;` the store still holds `a == b`, so `a` follows `b`.
    pub fn assignment(target: &str, value: &Expression, context: &SymbolicContext) -> Result<Self> {
        if context.lookup_variable(target).is_none() {
            return Err(SymexError::UndeclaredVariable {
                name: target.to_string(),
            });
        }
        let rhs = match value {
            Expression::Identifier { name } if context.lookup_variable(name).is_none() => {
                return Err(SymexError::UndeclaredVariable { name: name.clone() });
            }
            other => resolve_operand(other, context).ok_or_else(|| {
                SymexError::UnsupportedAssignment {
                    expression: format!("{} = {}", target, value),
                }
            })?,
        };

        Self::from_predicate(
            ConstraintKind::Assignment,
            Predicate::Compare {
                op: RelOp::Eq,
                lhs: Operand::Variable(target.to_string()),
                rhs,
            },
        )
    }

    /// Logical complement, built with the solver's own negation
    pub fn negate(&self) -> Self {
        Self {
            kind: self.kind,
            predicate: Predicate::Not(Box::new(self.predicate.clone())),
            term: self.term.not(),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn term(&self) -> &Bool {
        &self.term
    }

    /// Variable pinned by an assignment constraint
    pub fn assigned_variable(&self) -> Option<&str> {
        match (&self.kind, &self.predicate) {
            (
                ConstraintKind::Assignment,
                Predicate::Compare {
                    lhs: Operand::Variable(name),
                    ..
                },
            ) => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.predicate == other.predicate
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("kind", &self.kind)
            .field("predicate", &self.predicate)
            .finish()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}
