//! Configuration types for exploration

use crate::engine::solve::SolverConfig;

/// Order in which pending contexts are explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Work stack: finish one branch subtree before its sibling
    #[default]
    DepthFirst,
    /// Work queue: explore the branch tree level by level
    BreadthFirst,
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchStrategy::DepthFirst => write!(f, "depth-first"),
            SearchStrategy::BreadthFirst => write!(f, "breadth-first"),
        }
    }
}

impl std::str::FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depth-first" => Ok(SearchStrategy::DepthFirst),
            "breadth-first" => Ok(SearchStrategy::BreadthFirst),
            _ => Err(format!(
                "Unknown search strategy: '{}'. Valid options: depth-first, breadth-first",
                s
            )),
        }
    }
}

/// When branch feasibility is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeasibilityCheck {
    /// Solve only at terminal branches
    #[default]
    Lazy,
    /// Also solve every forked context before interpreting it, pruning
    /// infeasible subtrees early
    Eager,
}

impl std::fmt::Display for FeasibilityCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeasibilityCheck::Lazy => write!(f, "lazy"),
            FeasibilityCheck::Eager => write!(f, "eager"),
        }
    }
}

impl std::str::FromStr for FeasibilityCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lazy" => Ok(FeasibilityCheck::Lazy),
            "eager" => Ok(FeasibilityCheck::Eager),
            _ => Err(format!(
                "Unknown feasibility check: '{}'. Valid options: lazy, eager",
                s
            )),
        }
    }
}

/// What to do with statement kinds the engine does not model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    /// Abort the run
    #[default]
    Reject,
    /// Log a warning and continue as if the statement were absent
    Skip,
}

impl std::fmt::Display for UnsupportedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedPolicy::Reject => write!(f, "reject"),
            UnsupportedPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for UnsupportedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(UnsupportedPolicy::Reject),
            "skip" => Ok(UnsupportedPolicy::Skip),
            _ => Err(format!(
                "Unknown unsupported-statement policy: '{}'. Valid options: reject, skip",
                s
            )),
        }
    }
}

/// Configuration for one exploration run
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub strategy: SearchStrategy,
    pub feasibility: FeasibilityCheck,
    pub unsupported: UnsupportedPolicy,
    /// Snapshot every visited context for later resumption
    pub write_cache: bool,
    pub solver: SolverConfig,
}

impl EngineConfig {
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_feasibility(mut self, feasibility: FeasibilityCheck) -> Self {
        self.feasibility = feasibility;
        self
    }

    pub fn with_unsupported(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    pub fn with_write_cache(mut self, write_cache: bool) -> Self {
        self.write_cache = write_cache;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}
