use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use diffsym::cache::{read_cache, resume};
use diffsym::engine::{
    EngineConfig, ExplorationReport, Explorer, FeasibilityCheck, SearchStrategy, SolverConfig,
    UnsupportedPolicy,
};
use diffsym::generate::{GeneratorConfig, generate, write_generated};
use diffsym::output::RunDirectory;
use diffsym::syntax::{diff_programs, parse_program_file, read_diff, write_diff};

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "diffsym")]
#[command(about = "diffsym - differential symbolic execution for JavaScript")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// CLI search strategy selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliStrategy {
    /// Explore the consequent branch to completion first
    DepthFirst,
    /// Explore contexts level by level
    BreadthFirst,
}

impl From<CliStrategy> for SearchStrategy {
    fn from(cli: CliStrategy) -> Self {
        match cli {
            CliStrategy::DepthFirst => SearchStrategy::DepthFirst,
            CliStrategy::BreadthFirst => SearchStrategy::BreadthFirst,
        }
    }
}

/// CLI feasibility check selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFeasibility {
    /// Solve only when a path terminates
    Lazy,
    /// Also solve at every fork and prune infeasible branches
    Eager,
}

impl From<CliFeasibility> for FeasibilityCheck {
    fn from(cli: CliFeasibility) -> Self {
        match cli {
            CliFeasibility::Lazy => FeasibilityCheck::Lazy,
            CliFeasibility::Eager => FeasibilityCheck::Eager,
        }
    }
}

/// CLI handling of statements the engine does not model
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliUnsupported {
    /// Abort the run
    Reject,
    /// Log a warning and continue with the next statement
    Skip,
}

impl From<CliUnsupported> for UnsupportedPolicy {
    fn from(cli: CliUnsupported) -> Self {
        match cli {
            CliUnsupported::Reject => UnsupportedPolicy::Reject,
            CliUnsupported::Skip => UnsupportedPolicy::Skip,
        }
    }
}

/// Options shared by `run` and `resume`
#[derive(Args)]
struct EngineArgs {
    /// Record branch-point contexts to cache.jsonl in the run directory
    #[arg(long)]
    write_cache: bool,
    /// Root directory for run<N> output directories
    #[arg(long, short, default_value = "results")]
    output: PathBuf,
    /// Order in which pending contexts are explored
    #[arg(long, value_enum, default_value = "depth-first")]
    strategy: CliStrategy,
    /// When branch feasibility is checked
    #[arg(long, value_enum, default_value = "lazy")]
    feasibility: CliFeasibility,
    /// What to do with unsupported statements
    #[arg(long, value_enum, default_value = "reject")]
    unsupported: CliUnsupported,
    /// Solver timeout in seconds (0 disables the timeout)
    #[arg(long, default_value = "30")]
    solver_timeout: u64,
    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        let solver = if self.solver_timeout == 0 {
            SolverConfig::no_timeout()
        } else {
            SolverConfig::with_timeout_secs(self.solver_timeout)
        };
        EngineConfig::default()
            .with_strategy(self.strategy.into())
            .with_feasibility(self.feasibility.into())
            .with_unsupported(self.unsupported.into())
            .with_write_cache(self.write_cache)
            .with_solver(solver)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Explore every path of a program
    Run {
        /// Path to the JavaScript program
        program: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Re-explore an edited program from a prior run's cache
    Resume {
        /// cache.jsonl written by `run --write-cache`
        #[arg(long)]
        cache: PathBuf,
        /// Diff file written by `diff`
        #[arg(long)]
        diff: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Compute the diff between two versions of a program
    Diff {
        /// Original program
        old: PathBuf,
        /// Edited program
        new: PathBuf,
        /// Where to write the diff
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Generate a random program and an edited copy of it
    Generate {
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
        /// Number of symbolic variables
        #[arg(long, default_value = "3")]
        vars: usize,
        /// Maximum nesting depth of conditionals
        #[arg(long, default_value = "3")]
        depth: usize,
        /// Directory for the generated files
        #[arg(long, short)]
        output: PathBuf,
        /// Base name of the generated files
        #[arg(long, default_value = "program")]
        name: String,
        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,
    },
}

// --- Commands ---

fn print_report(run: &RunDirectory, report: &ExplorationReport) {
    println!("Run directory: {}", run.path().display());
    if report.results.is_empty() {
        println!("No feasible terminal paths.");
    }
    for (index, record) in report.results.iter().enumerate() {
        println!("  [{}] {}", index + 1, record);
    }
    if !report.cache.is_empty() {
        println!("Cache: {}", run.cache_path().display());
    }
    println!();
    println!("{}", report.statistics.format_summary());
}

fn run_program(program: &Path, engine: &EngineArgs) -> Result<(), Box<dyn std::error::Error>> {
    let statements = parse_program_file(program)?;
    let mut run = RunDirectory::create(&engine.output)?;
    let report = Explorer::new(engine.config())
        .with_storage(&mut run)
        .run(statements)?;
    run.flush()?;
    print_report(&run, &report);
    Ok(())
}

fn resume_program(
    cache: &Path,
    diff: &Path,
    engine: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = read_cache(cache)?;
    let diff = read_diff(diff)?;
    let mut run = RunDirectory::create(&engine.output)?;
    let report = resume(&diff, &entries, engine.config(), Some(&mut run))?;
    run.flush()?;
    print_report(&run, &report);
    Ok(())
}

fn diff_files(old: &Path, new: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let old = parse_program_file(old)?;
    let new = parse_program_file(new)?;
    let diff = diff_programs(&old, &new);
    write_diff(output, &diff)?;
    println!("Wrote diff ({} statements): {}", diff.len(), output.display());
    Ok(())
}

fn generate_program(config: &GeneratorConfig, output: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let generated = generate(config);
    let files = write_generated(output, name, &generated)?;
    let stats = &generated.statistics;
    println!("Program:    {}", files.program.display());
    println!("Edited:     {}", files.edited.display());
    println!("Statistics: {}", files.statistics.display());
    println!(
        "  {} conditionals, {} branches, {} throws, average depth {:.2}",
        stats.conditionals, stats.branches, stats.throws, stats.average_depth
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Run { engine, .. } | Commands::Resume { engine, .. } => engine.verbose,
        Commands::Generate { verbose, .. } => *verbose,
        Commands::Diff { .. } => false,
    };
    init_logging(verbose);

    let outcome = match &cli.command {
        Commands::Run { program, engine } => run_program(program, engine),
        Commands::Resume {
            cache,
            diff,
            engine,
        } => resume_program(cache, diff, engine),
        Commands::Diff { old, new, output } => diff_files(old, new, output),
        Commands::Generate {
            seed,
            vars,
            depth,
            output,
            name,
            ..
        } => {
            let config = GeneratorConfig::default()
                .with_seed_option(*seed)
                .with_variables(*vars)
                .with_max_depth(*depth);
            generate_program(&config, output, name)
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
