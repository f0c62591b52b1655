//! Result records and run statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::engine::config::{FeasibilityCheck, SearchStrategy};

/// Concrete value read from a satisfying model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WitnessValue {
    Rational { numerator: i64, denominator: i64 },
    /// Model value without a small rational form (algebraic numbers, huge numerals)
    Text(String),
}

impl WitnessValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WitnessValue::Rational {
                numerator,
                denominator,
            } if *denominator != 0 => Some(*numerator as f64 / *denominator as f64),
            _ => None,
        }
    }
}

impl fmt::Display for WitnessValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WitnessValue::Rational {
                numerator,
                denominator: 1,
            } => write!(f, "{}", numerator),
            WitnessValue::Rational {
                numerator,
                denominator,
            } => write!(f, "{}/{}", numerator, denominator),
            WitnessValue::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub name: String,
    pub value: WitnessValue,
}

/// How a terminal branch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Terminal {
    /// An uncaught throw; `detail` is the thrown expression
    ReachedThrow { detail: String },
    /// Fell off the end of the statements
    ReachedEnd,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::ReachedThrow { detail } => write!(f, "reached-throw ({})", detail),
            Terminal::ReachedEnd => write!(f, "reached-end"),
        }
    }
}

/// One satisfiable terminal branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub witnesses: Vec<Witness>,
    pub terminal: Terminal,
}

impl ResultRecord {
    pub fn witness(&self, name: &str) -> Option<&WitnessValue> {
        self.witnesses
            .iter()
            .find(|witness| witness.name == name)
            .map(|witness| &witness.value)
    }

    pub fn is_throw(&self) -> bool {
        matches!(self.terminal, Terminal::ReachedThrow { .. })
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.terminal)?;
        if !self.witnesses.is_empty() {
            write!(f, " with ")?;
            for (i, witness) in self.witnesses.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} = {}", witness.name, witness.value)?;
            }
        }
        Ok(())
    }
}

/// Counters from one exploration run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub strategy: SearchStrategy,
    pub feasibility: FeasibilityCheck,
    pub elapsed_time: Duration,
    /// Contexts popped from the work list
    pub contexts_visited: u64,
    /// Conditionals that split a context in two
    pub forks: u64,
    /// Contexts that reached a throw or the end of their statements
    pub terminals: u64,
    pub solver_queries: u64,
    pub satisfiable: u64,
    pub infeasible: u64,
    /// Queries the solver could not decide, including timeouts
    pub unknown: u64,
    /// Contexts dropped by eager feasibility checks
    pub pruned: u64,
    pub results: u64,
    pub cache_entries: u64,
}

impl RunStatistics {
    pub fn new(strategy: SearchStrategy, feasibility: FeasibilityCheck) -> Self {
        Self {
            strategy,
            feasibility,
            ..Default::default()
        }
    }

    /// Fraction of solver queries that were satisfiable (0.0 to 1.0)
    pub fn sat_rate(&self) -> f64 {
        if self.solver_queries == 0 {
            0.0
        } else {
            self.satisfiable as f64 / self.solver_queries as f64
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Strategy: {}\n", self.strategy));
        s.push_str(&format!("Feasibility checks: {}\n", self.feasibility));
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Contexts visited: {}\n", self.contexts_visited));
        s.push_str(&format!("Forks: {}\n", self.forks));
        s.push_str(&format!("Terminal branches: {}\n", self.terminals));

        if self.solver_queries > 0 {
            s.push_str(&format!("Solver queries: {}\n", self.solver_queries));
            s.push_str(&format!(
                "Satisfiable: {} ({:.2}%)\n",
                self.satisfiable,
                self.sat_rate() * 100.0
            ));
            s.push_str(&format!("Infeasible: {}\n", self.infeasible));
        }
        if self.unknown > 0 {
            s.push_str(&format!("Unknown: {}\n", self.unknown));
        }
        if self.feasibility == FeasibilityCheck::Eager {
            s.push_str(&format!("Pruned: {}\n", self.pruned));
        }
        if self.cache_entries > 0 {
            s.push_str(&format!("Cache entries: {}\n", self.cache_entries));
        }

        s.push_str(&format!("Results: {}\n", self.results));
        s
    }
}
