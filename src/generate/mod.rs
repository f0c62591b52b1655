//! Random program generator
//!
//! Produces analysable programs: a set of fresh symbolic numbers followed by
//! a tree of nested `if`/`else` conditionals over random relational tests,
//! padded with literal declarations and occasionally ending a branch in a
//! throw. Alongside each program it builds an edited copy with one literal
//! declaration changed, which is the input shape the differ and the resume
//! protocol are exercised with.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::syntax::{
    render_program, BinaryOperator, DeclarationKind, Declarator, Expression, IfStatement, Literal,
    Statement, VariableDeclaration,
};

const COMPARATORS: &[BinaryOperator] = &[
    BinaryOperator::StrictEq,
    BinaryOperator::Gt,
    BinaryOperator::Lt,
    BinaryOperator::Le,
    BinaryOperator::Ge,
];

const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Configuration for program generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for the random number generator (None = random seed)
    pub seed: Option<u64>,
    /// Number of symbolic variables declared up front
    pub variables: usize,
    /// Deepest nesting level a conditional may be placed at
    pub max_depth: usize,
    /// Upper bound on nested conditionals per branch
    pub max_conditionals_per_branch: usize,
    /// Upper bound on filler statements per branch
    pub max_branch_length: usize,
    /// Chance that a branch ends in a throw
    pub throw_probability: f64,
    /// Literals are drawn from `0..=literal_max`
    pub literal_max: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            variables: 3,
            max_depth: 3,
            max_conditionals_per_branch: 2,
            max_branch_length: 6,
            throw_probability: 0.3,
            literal_max: 1000,
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_variables(mut self, variables: usize) -> Self {
        self.variables = variables.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_throw_probability(mut self, probability: f64) -> Self {
        self.throw_probability = probability.clamp(0.0, 1.0);
        self
    }
}

/// Shape statistics of a generated program
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneratorStatistics {
    pub variables: usize,
    pub max_branch_length: usize,
    pub max_conditionals_per_branch: usize,
    pub max_depth: usize,
    pub average_branch_length: f64,
    pub average_conditionals_per_branch: f64,
    pub average_depth: f64,
    pub branches: usize,
    pub conditionals: usize,
    pub throws: usize,
}

#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub program: Vec<Statement>,
    /// Copy of `program` with one literal declaration changed
    pub edited: Vec<Statement>,
    pub statistics: GeneratorStatistics,
}

/// Paths written by [`write_generated`]
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    pub program: PathBuf,
    pub edited: PathBuf,
    pub statistics: PathBuf,
}

struct Generator<'a> {
    config: &'a GeneratorConfig,
    rng: ChaCha8Rng,
    filler_statements: usize,
    depths: Vec<usize>,
    conditionals_in_branch: Vec<usize>,
    branches: usize,
    conditionals: usize,
    throws: usize,
}

impl<'a> Generator<'a> {
    fn new(config: &'a GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self {
            config,
            rng,
            filler_statements: 0,
            depths: Vec::new(),
            conditionals_in_branch: Vec::new(),
            branches: 0,
            conditionals: 0,
            throws: 0,
        }
    }

    fn random_name(&mut self) -> String {
        (0..10)
            .map(|_| NAME_ALPHABET[self.rng.random_range(0..NAME_ALPHABET.len())] as char)
            .collect()
    }

    fn literal(&mut self) -> f64 {
        self.rng.random_range(0..=self.config.literal_max) as f64
    }

    fn filler(&mut self, body: &mut Vec<Statement>, per_branch: usize) {
        let count = self
            .rng
            .random_range(0..=self.config.max_branch_length / (2 * per_branch));
        for _ in 0..count {
            let kind = if self.rng.random_bool(0.5) {
                DeclarationKind::Let
            } else {
                DeclarationKind::Const
            };
            let id = self.random_name();
            let init = Some(Expression::number(self.literal()));
            body.push(Statement::VariableDeclaration(VariableDeclaration {
                kind,
                declarations: vec![Declarator { id, init }],
            }));
            self.filler_statements += 1;
        }
    }

    fn conditional(&mut self, depth: usize) -> Statement {
        self.conditionals += 1;
        self.branches += 2;
        self.depths.push(depth);

        let variable = self.rng.random_range(0..self.config.variables.max(1));
        let operator = COMPARATORS[self.rng.random_range(0..COMPARATORS.len())];
        let test = Expression::binary(
            operator,
            Expression::identifier(format!("sym{}", variable)),
            Expression::number(self.literal()),
        );

        let per_branch = self
            .rng
            .random_range(1..=self.config.max_conditionals_per_branch.max(1));
        let consequent = self.branch_body(per_branch, depth);
        let alternate = self.branch_body(per_branch, depth);

        Statement::IfStatement(IfStatement {
            test,
            consequent: Box::new(Statement::BlockStatement { body: consequent }),
            alternate: Some(Box::new(Statement::BlockStatement { body: alternate })),
        })
    }

    fn branch_body(&mut self, per_branch: usize, depth: usize) -> Vec<Statement> {
        let mut body = Vec::new();
        let mut nested = 0;
        for _ in 0..per_branch {
            self.filler(&mut body, per_branch);
            if depth < self.config.max_depth && self.rng.random_bool(0.5) {
                nested += 1;
                body.push(self.conditional(depth + 1));
            }
            self.filler(&mut body, per_branch);
        }
        if self.rng.random_bool(self.config.throw_probability) {
            self.throws += 1;
            body.push(Statement::ThrowStatement {
                argument: Expression::Call {
                    callee: Box::new(Expression::identifier("Error")),
                    arguments: vec![Expression::string(format!("branch {}", self.throws))],
                },
            });
        }
        self.conditionals_in_branch.push(nested);
        body
    }

    fn statistics(&self) -> GeneratorStatistics {
        let average = |values: &[usize]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<usize>() as f64 / values.len() as f64
            }
        };
        GeneratorStatistics {
            variables: self.config.variables,
            max_branch_length: self.config.max_branch_length,
            max_conditionals_per_branch: self.config.max_conditionals_per_branch,
            max_depth: self.config.max_depth,
            average_branch_length: if self.branches == 0 {
                0.0
            } else {
                self.filler_statements as f64 / self.branches as f64
            },
            average_conditionals_per_branch: average(&self.conditionals_in_branch),
            average_depth: average(&self.depths),
            branches: self.branches,
            conditionals: self.conditionals,
            throws: self.throws,
        }
    }
}

/// Number of literal declarations anywhere in the program
fn count_literal_declarations(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(|statement| match statement {
            Statement::VariableDeclaration(declaration) => declaration
                .declarations
                .iter()
                .filter(|d| matches!(d.init, Some(Expression::Literal { .. })))
                .count(),
            Statement::BlockStatement { body } => count_literal_declarations(body),
            Statement::IfStatement(conditional) => {
                count_literal_declarations(std::slice::from_ref(conditional.consequent.as_ref()))
                    + conditional
                        .alternate
                        .as_deref()
                        .map(|alternate| count_literal_declarations(std::slice::from_ref(alternate)))
                        .unwrap_or(0)
            }
            _ => 0,
        })
        .sum()
}

/// Scale the `target`-th literal declaration (in source order) by ten.
/// Returns true once the edit has been made.
fn edit_literal(statements: &mut [Statement], target: &mut usize) -> bool {
    for statement in statements {
        let done = match statement {
            Statement::VariableDeclaration(declaration) => {
                let mut done = false;
                for declarator in &mut declaration.declarations {
                    if let Some(Expression::Literal { value }) = declarator.init.as_mut() {
                        if *target == 0 {
                            let current = value.as_number().unwrap_or(0.0);
                            let edited = if current == 0.0 { 1.0 } else { current * 10.0 };
                            *value = Literal::Number(edited);
                            done = true;
                            break;
                        }
                        *target -= 1;
                    }
                }
                done
            }
            Statement::BlockStatement { body } => edit_literal(body, target),
            Statement::IfStatement(conditional) => {
                edit_literal(std::slice::from_mut(conditional.consequent.as_mut()), target)
                    || conditional
                        .alternate
                        .as_deref_mut()
                        .is_some_and(|alternate| edit_literal(std::slice::from_mut(alternate), target))
            }
            _ => false,
        };
        if done {
            return true;
        }
    }
    false
}

/// Generate a program, its edited copy and shape statistics
pub fn generate(config: &GeneratorConfig) -> GeneratedProgram {
    let mut generator = Generator::new(config);

    let mut program: Vec<Statement> = (0..config.variables.max(1))
        .map(|i| {
            Statement::VariableDeclaration(VariableDeclaration {
                kind: DeclarationKind::Let,
                declarations: vec![Declarator {
                    id: format!("sym{}", i),
                    init: Some(Expression::New {
                        callee: Box::new(Expression::identifier("SymbolicNumber")),
                        arguments: Vec::new(),
                    }),
                }],
            })
        })
        .collect();
    program.push(generator.conditional(0));

    let mut edited = program.clone();
    let candidates = count_literal_declarations(&edited);
    if candidates > 0 {
        let mut target = generator.rng.random_range(0..candidates);
        edit_literal(&mut edited, &mut target);
    }

    GeneratedProgram {
        program,
        edited,
        statistics: generator.statistics(),
    }
}

/// Write `<name>.js`, `<name>.edited.js` and `<name>.stats.json` into `dir`
pub fn write_generated(dir: &Path, name: &str, generated: &GeneratedProgram) -> Result<GeneratedFiles> {
    fs::create_dir_all(dir)?;
    let files = GeneratedFiles {
        program: dir.join(format!("{}.js", name)),
        edited: dir.join(format!("{}.edited.js", name)),
        statistics: dir.join(format!("{}.stats.json", name)),
    };
    fs::write(&files.program, render_program(&generated.program))?;
    fs::write(&files.edited, render_program(&generated.edited))?;
    fs::write(
        &files.statistics,
        serde_json::to_string_pretty(&generated.statistics)?,
    )?;
    info!(
        program = %files.program.display(),
        conditionals = generated.statistics.conditionals,
        "wrote generated program"
    );
    Ok(files)
}
