//! Vek CLI: inspect and maintain the incremental build cache of a project.
//!
//! Provides `vek check` for classifying files against the cache the way a
//! build would, `vek status` for summarizing the manifest, `vek prune` for
//! running eviction on demand, and `vek clean` for dropping the cache.

#![warn(missing_docs)]

mod check;
mod logging;
mod maintenance;
mod project;
mod status;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Vek: incremental build cache for bundler pipelines.
#[derive(Parser, Debug)]
#[command(name = "vek", version, about = "Vek build cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output, including per-file hit/miss logs.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root. Defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Path to a custom `vek.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one build cycle over the given files and report hits and misses.
    Check(CheckArgs),
    /// Summarize the cache manifest.
    Status(StatusArgs),
    /// Remove stale entries and enforce the capacity bound.
    Prune,
    /// Delete the cache manifest.
    Clean,
}

/// Arguments for the `vek check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Files to check, absolute or relative to the project root.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Exit with status 1 if any checked file was a miss.
    #[arg(long)]
    pub fail_on_miss: bool,
}

/// Arguments for the `vek status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Print the raw manifest as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Explicit project root, if given.
    pub root: Option<PathBuf>,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        root: cli.root,
        config: cli.config,
    };

    let project = match project::Project::load(&global) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    logging::init(&global, project.config.verbose);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &project, &global),
        Command::Status(ref args) => status::run(args, &project),
        Command::Prune => maintenance::prune(&project, &global),
        Command::Clean => maintenance::clean(&project, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
