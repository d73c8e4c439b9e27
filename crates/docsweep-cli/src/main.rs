mod cmd;
mod output;
mod root;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{config::ConfigSubcommand, ScopeArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docsweep",
    about = "Keep documentation consistent: broken links, duplicates, stale docs and orphans",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .docsweep.yaml or .git/)
    #[arg(long, global = true, env = "DOCSWEEP_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.docsweep.yaml)
    #[arg(long, global = true, env = "DOCSWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .docsweep.yaml if none exists
    Init,

    /// Show or validate the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Discover the documentation corpus and the documents in focus
    Scan {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Report broken links and anchors
    Links {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Report near-duplicate passages across documents
    Dupes {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Similarity threshold in (0, 1] (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Report documents whose referenced sources changed after them
    Stale {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Minimum lag in days before a document counts as stale (overrides config)
        #[arg(long)]
        min_lag_days: Option<u32>,
    },

    /// Report documents unreachable from the root documents
    Orphans {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Build a prioritized maintenance plan
    Plan {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Write the plan as markdown to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Remove orphaned documents (dry run unless --apply)
    Prune {
        /// Actually delete files
        #[arg(long)]
        apply: bool,
    },

    /// Run every analyzer and fail if findings at or above a severity remain
    Check {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Lowest severity that fails the check: critical, high, medium or low
        #[arg(long, default_value = "high")]
        fail_on: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let ctx = cmd::Context {
        root,
        config_path: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&ctx),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
        Commands::Scan { scope } => cmd::scan::run(&ctx, &scope),
        Commands::Links { scope } => cmd::links::run(&ctx, &scope),
        Commands::Dupes { scope, threshold } => cmd::dupes::run(&ctx, &scope, threshold),
        Commands::Stale {
            scope,
            min_lag_days,
        } => cmd::stale::run(&ctx, &scope, min_lag_days),
        Commands::Orphans { scope } => cmd::orphans::run(&ctx, &scope),
        Commands::Plan { scope, output } => cmd::plan::run(&ctx, &scope, output.as_deref()),
        Commands::Prune { apply } => cmd::prune::run(&ctx, apply),
        Commands::Check { scope, fail_on } => cmd::check::run(&ctx, &scope, &fail_on),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
