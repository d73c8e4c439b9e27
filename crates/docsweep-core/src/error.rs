use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocsweepError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("not a git repository: {0} (incremental scans need git history)")]
    NotAGitRepository(String),

    #[error("git executable not found on PATH")]
    GitUnavailable,

    #[error("git {args} failed: {stderr}")]
    GitCommand { args: String, stderr: String },

    #[error("unknown git reference: {0}")]
    InvalidReference(String),

    #[error("path escapes the repository root: {0}")]
    OutsideRoot(String),

    #[error("unknown severity: {0} (expected critical, high, medium or low)")]
    UnknownSeverity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Glob(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, DocsweepError>;
