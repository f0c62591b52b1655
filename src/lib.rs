//! Differential symbolic execution for a small subset of JavaScript
//!
//! Programs are explored path by path over symbolic real-valued variables.
//! A run can record a cache of branch-point contexts; after an edit, the
//! diff of the two programs locates the innermost affected conditional and
//! exploration resumes from its cached context.

pub mod cache;
pub mod engine;
pub mod error;
pub mod generate;
pub mod output;
pub mod symbolic;
pub mod syntax;

pub use error::{Result, SymexError};
