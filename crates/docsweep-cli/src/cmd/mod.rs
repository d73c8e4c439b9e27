pub mod check;
pub mod config;
pub mod dupes;
pub mod init;
pub mod links;
pub mod orphans;
pub mod plan;
pub mod prune;
pub mod scan;
pub mod stale;

use anyhow::Context as _;
use clap::Args;
use docsweep_core::config::Config;
use docsweep_core::corpus::ScanMode;
use docsweep_core::report::Analysis;
use std::path::PathBuf;

/// Global flags every command sees.
pub struct Context {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    /// `--config` when given (and then it must exist), else the root's
    /// `.docsweep.yaml`, else defaults.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config_path {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => Config::load(&self.root).context("failed to load config"),
        }
    }

    pub fn prepare(&self, config: &Config, scope: &ScopeArgs) -> anyhow::Result<Analysis> {
        let mode = scope.mode();
        Analysis::prepare(&self.root, config, mode.clone())
            .with_context(|| format!("failed to scan {} ({mode})", self.root.display()))
    }
}

/// Incremental scan flags shared by the analysis commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Only report on files changed since this git reference (tag, branch or commit)
    #[arg(long, value_name = "REF", conflicts_with = "days")]
    pub since: Option<String>,

    /// Only report on files changed in the last N days
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,
}

impl ScopeArgs {
    pub fn mode(&self) -> ScanMode {
        match (&self.since, self.days) {
            (Some(reference), _) => ScanMode::SinceRef {
                reference: reference.clone(),
            },
            (None, Some(days)) => ScanMode::Window { days },
            (None, None) => ScanMode::Full,
        }
    }
}
