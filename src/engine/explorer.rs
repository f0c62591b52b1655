//! Branch-forking exploration over the statement tree
//!
//! The explorer owns a work list of pending contexts. Each popped context is
//! interpreted one statement at a time until it either forks at a
//! conditional (two children go back on the work list) or reaches a
//! terminal, whose path condition is solved and reported.

use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};
use z3::SatResult;

use crate::cache::{BranchSide, CacheEntry};
use crate::engine::config::{EngineConfig, FeasibilityCheck, SearchStrategy, UnsupportedPolicy};
use crate::engine::result::{ResultRecord, RunStatistics, Terminal};
use crate::engine::solve::{check_feasible, solve_path, PathOutcome};
use crate::error::{Result, SymexError};
use crate::output::RunDirectory;
use crate::symbolic::{Constraint, SymbolicContext, SymbolicVariable};
use crate::syntax::{AssignmentOperator, Declarator, Expression, IfStatement, Statement};

/// Constructors that introduce a fresh symbolic number
const SYMBOLIC_CONSTRUCTORS: &[&str] = &["SymbolicNumber", "Number"];

/// A context waiting on the work list, with the branch that produced it
#[derive(Debug, Clone)]
pub struct Frame {
    pub context: SymbolicContext,
    pub last_conditional: Option<IfStatement>,
    pub branch: Option<BranchSide>,
}

impl Frame {
    pub fn root(statements: Vec<Statement>) -> Self {
        Self {
            context: SymbolicContext::new(statements),
            last_conditional: None,
            branch: None,
        }
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct ExplorationReport {
    pub results: Vec<ResultRecord>,
    /// Snapshots in visitation order; empty unless caching is enabled
    pub cache: Vec<CacheEntry>,
    pub statistics: RunStatistics,
}

impl ExplorationReport {
    pub fn throws(&self) -> impl Iterator<Item = &ResultRecord> {
        self.results.iter().filter(|record| record.is_throw())
    }
}

enum Step {
    Fork { consequent: Frame, alternate: Frame },
    Terminal(Terminal),
}

pub struct Explorer<'a> {
    config: EngineConfig,
    storage: Option<&'a mut RunDirectory>,
    statistics: RunStatistics,
    results: Vec<ResultRecord>,
    cache: Vec<CacheEntry>,
}

impl<'a> Explorer<'a> {
    pub fn new(config: EngineConfig) -> Self {
        let statistics = RunStatistics::new(config.strategy, config.feasibility);
        Self {
            config,
            storage: None,
            statistics,
            results: Vec::new(),
            cache: Vec::new(),
        }
    }

    /// Persist results (and cache entries, when enabled) to a run directory
    pub fn with_storage(mut self, storage: &'a mut RunDirectory) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Explore a whole program from its root
    pub fn run(self, program: Vec<Statement>) -> Result<ExplorationReport> {
        self.explore(Frame::root(program))
    }

    /// Explore from an arbitrary starting frame
    pub fn explore(mut self, start: Frame) -> Result<ExplorationReport> {
        let started = Instant::now();
        info!(
            strategy = %self.config.strategy,
            feasibility = %self.config.feasibility,
            statements = start.context.remaining().len(),
            "starting exploration"
        );

        let mut worklist = VecDeque::from([start]);
        while let Some(frame) = self.pop(&mut worklist) {
            self.statistics.contexts_visited += 1;
            if self.config.write_cache {
                self.record_snapshot(&frame)?;
            }
            if !self.feasible_before_interpreting(&frame) {
                continue;
            }

            let Frame {
                mut context,
                last_conditional,
                ..
            } = frame;
            match self.interpret(&mut context)? {
                Step::Fork {
                    consequent,
                    alternate,
                } => {
                    self.statistics.forks += 1;
                    match self.config.strategy {
                        SearchStrategy::DepthFirst => {
                            worklist.push_back(alternate);
                            worklist.push_back(consequent);
                        }
                        SearchStrategy::BreadthFirst => {
                            worklist.push_back(consequent);
                            worklist.push_back(alternate);
                        }
                    }
                }
                Step::Terminal(terminal) => {
                    self.statistics.terminals += 1;
                    self.report(&context, last_conditional.as_ref(), terminal)?;
                }
            }
        }

        if let Some(storage) = self.storage.as_mut() {
            storage.flush()?;
        }
        self.statistics.elapsed_time = started.elapsed();
        info!(
            results = self.statistics.results,
            visited = self.statistics.contexts_visited,
            "exploration finished"
        );
        Ok(ExplorationReport {
            results: self.results,
            cache: self.cache,
            statistics: self.statistics,
        })
    }

    fn pop(&self, worklist: &mut VecDeque<Frame>) -> Option<Frame> {
        match self.config.strategy {
            SearchStrategy::DepthFirst => worklist.pop_back(),
            SearchStrategy::BreadthFirst => worklist.pop_front(),
        }
    }

    fn record_snapshot(&mut self, frame: &Frame) -> Result<()> {
        let entry = CacheEntry::snapshot(
            &frame.context,
            frame.last_conditional.as_ref(),
            frame.branch,
        );
        if let Some(storage) = self.storage.as_mut() {
            storage.append_cache(&entry)?;
        }
        self.cache.push(entry);
        self.statistics.cache_entries += 1;
        Ok(())
    }

    /// Eager mode solves every constrained non-root context before running it
    fn feasible_before_interpreting(&mut self, frame: &Frame) -> bool {
        if self.config.feasibility != FeasibilityCheck::Eager
            || frame.last_conditional.is_none()
            || frame.context.constraints().is_empty()
        {
            return true;
        }
        self.statistics.solver_queries += 1;
        let result = check_feasible(frame.context.constraints(), &self.config.solver);
        self.admit(frame.branch, result)
    }

    /// Only a satisfiable context is interpreted further
    fn admit(&mut self, branch: Option<BranchSide>, result: SatResult) -> bool {
        match result {
            SatResult::Sat => {
                self.statistics.satisfiable += 1;
                true
            }
            SatResult::Unsat => {
                self.statistics.infeasible += 1;
                self.statistics.pruned += 1;
                debug!(branch = ?branch, "pruned infeasible branch");
                false
            }
            SatResult::Unknown => {
                self.statistics.unknown += 1;
                self.statistics.pruned += 1;
                debug!(branch = ?branch, "pruned undecided branch");
                false
            }
        }
    }

    fn interpret(&self, context: &mut SymbolicContext) -> Result<Step> {
        while let Some(statement) = context.next_statement() {
            match statement {
                Statement::VariableDeclaration(declaration) => {
                    for declarator in &declaration.declarations {
                        declare(context, declarator)?;
                    }
                }
                Statement::ExpressionStatement { expression } => {
                    self.expression_statement(context, &expression)?;
                }
                Statement::IfStatement(conditional) => return fork(context, conditional),
                Statement::ThrowStatement { argument } => {
                    return Ok(Step::Terminal(Terminal::ReachedThrow {
                        detail: argument.to_string(),
                    }));
                }
                Statement::BlockStatement { body } => context.prepend(body),
                Statement::EmptyStatement => {}
                Statement::Unsupported { kind, source } => self.unsupported(kind, source)?,
                divergence @ Statement::Divergence { .. } => {
                    self.unsupported("Divergence".to_string(), divergence.to_string())?
                }
            }
        }
        Ok(Step::Terminal(Terminal::ReachedEnd))
    }

    fn expression_statement(&self, context: &mut SymbolicContext, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Assignment {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } => {
                let Expression::Identifier { name } = left.as_ref() else {
                    return Err(SymexError::UnsupportedAssignment {
                        expression: expression.to_string(),
                    });
                };
                let constraint = Constraint::assignment(name, right, context)?;
                context.add_constraint(constraint);
                Ok(())
            }
            Expression::Assignment { .. } => Err(SymexError::UnsupportedAssignment {
                expression: expression.to_string(),
            }),
            other => self.unsupported(other.kind_name().to_string(), other.to_string()),
        }
    }

    fn unsupported(&self, kind: String, source_text: String) -> Result<()> {
        match self.config.unsupported {
            UnsupportedPolicy::Reject => Err(SymexError::UnsupportedStatement { kind, source_text }),
            UnsupportedPolicy::Skip => {
                warn!(kind = %kind, source = %source_text, "skipping unsupported statement");
                Ok(())
            }
        }
    }

    fn report(
        &mut self,
        context: &SymbolicContext,
        last_conditional: Option<&IfStatement>,
        terminal: Terminal,
    ) -> Result<()> {
        self.statistics.solver_queries += 1;
        let outcome = solve_path(
            context.constraints(),
            context.tracked_variables(),
            &self.config.solver,
        );
        self.record_outcome(last_conditional, terminal, outcome)
    }

    /// Report a satisfiable terminal; infeasible and undecided ones are dropped
    fn record_outcome(
        &mut self,
        last_conditional: Option<&IfStatement>,
        terminal: Terminal,
        outcome: PathOutcome,
    ) -> Result<()> {
        match outcome {
            PathOutcome::Satisfiable(witnesses) => {
                self.statistics.satisfiable += 1;
                let record = ResultRecord {
                    witnesses,
                    terminal,
                };
                info!(result = %record, "satisfiable branch");
                if let Some(storage) = self.storage.as_mut() {
                    storage.write_result(&record)?;
                }
                self.statistics.results += 1;
                self.results.push(record);
            }
            PathOutcome::Infeasible => {
                self.statistics.infeasible += 1;
                debug!(
                    conditional = ?last_conditional.map(|c| c.test.to_string()),
                    "infeasible branch"
                );
            }
            PathOutcome::Unknown => {
                self.statistics.unknown += 1;
                warn!(
                    conditional = ?last_conditional.map(|c| c.test.to_string()),
                    "solver could not decide branch, dropping it"
                );
            }
        }
        Ok(())
    }
}

fn is_symbolic_constructor(callee: &Expression) -> bool {
    matches!(callee, Expression::Identifier { name } if SYMBOLIC_CONSTRUCTORS.contains(&name.as_str()))
}

fn declare(context: &mut SymbolicContext, declarator: &Declarator) -> Result<()> {
    let name = &declarator.id;
    match &declarator.init {
        Some(Expression::New { callee, .. }) if is_symbolic_constructor(callee) => {
            context.declare_variable(SymbolicVariable::new(name.as_str(), true));
            Ok(())
        }
        Some(init) if init.as_number().is_some() => {
            context.declare_variable(SymbolicVariable::new(name.as_str(), true));
            let pin = Constraint::assignment(name, init, context)?;
            context.add_constraint(pin);
            Ok(())
        }
        Some(init) => Err(SymexError::UnsupportedDeclaration {
            name: name.clone(),
            reason: format!(
                "initializer `{}` is neither a symbolic constructor nor a numeric literal",
                init
            ),
        }),
        None => Err(SymexError::UnsupportedDeclaration {
            name: name.clone(),
            reason: "missing initializer".to_string(),
        }),
    }
}

/// Split a context at a conditional: each child runs its branch body and then
/// the statements after the `if`
fn fork(context: &mut SymbolicContext, conditional: IfStatement) -> Result<Step> {
    let then_constraint = Constraint::relational(&conditional.test, context)?;
    let else_constraint = then_constraint.negate();
    debug!(test = %conditional.test, "forking");

    let continuation = context.take_remaining();
    let mut then_body = conditional.consequent_body();
    then_body.extend(continuation.iter().cloned());
    let mut else_body = conditional.alternate_body();
    else_body.extend(continuation);

    let mut then_context = context.fork().with_remaining(then_body);
    then_context.add_constraint(then_constraint);
    let mut else_context = context.fork().with_remaining(else_body);
    else_context.add_constraint(else_constraint);

    Ok(Step::Fork {
        consequent: Frame {
            context: then_context,
            last_conditional: Some(conditional.clone()),
            branch: Some(BranchSide::Consequent),
        },
        alternate: Frame {
            context: else_context,
            last_conditional: Some(conditional),
            branch: Some(BranchSide::Alternate),
        },
    })
}
