//! Named numeric unknowns

use serde::{Deserialize, Serialize};
use std::fmt;
use z3::ast::Real;

/// A program variable modelled as a real-valued solver constant.
///
/// The solver term is derived from the name alone, so two variables with the
/// same name (for instance one rebuilt from a cache snapshot) denote the same
/// unknown.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "VariableRecord", into = "VariableRecord")]
pub struct SymbolicVariable {
    name: String,
    term: Real,
    tracked: bool,
}

#[derive(Serialize, Deserialize)]
struct VariableRecord {
    name: String,
    tracked: bool,
}

impl From<VariableRecord> for SymbolicVariable {
    fn from(record: VariableRecord) -> Self {
        SymbolicVariable::new(record.name, record.tracked)
    }
}

impl From<SymbolicVariable> for VariableRecord {
    fn from(variable: SymbolicVariable) -> Self {
        VariableRecord {
            name: variable.name,
            tracked: variable.tracked,
        }
    }
}

impl SymbolicVariable {
    /// Tracked variables get witness values in result records
    pub fn new(name: impl Into<String>, tracked: bool) -> Self {
        let name = name.into();
        let term = Real::new_const(name.as_str());
        Self {
            name,
            term,
            tracked,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn term(&self) -> &Real {
        &self.term
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }
}

impl PartialEq for SymbolicVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.tracked == other.tracked
    }
}

impl fmt::Debug for SymbolicVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicVariable")
            .field("name", &self.name)
            .field("tracked", &self.tracked)
            .finish()
    }
}

impl fmt::Display for SymbolicVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
