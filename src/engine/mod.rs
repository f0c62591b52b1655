//! Exploration engine: configuration, solving, results and the search loop

pub mod config;
pub mod explorer;
pub mod result;
pub mod solve;

pub use config::{EngineConfig, FeasibilityCheck, SearchStrategy, UnsupportedPolicy};
pub use explorer::{ExplorationReport, Explorer, Frame};
pub use result::{ResultRecord, RunStatistics, Terminal, Witness, WitnessValue};
pub use solve::{create_solver_with_config, PathOutcome, SolverConfig};
