use crate::git::{self, GitHistory};
use crate::paths;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Answers "when did this path last change?" for staleness and recency scoring.
pub trait RevisionSource {
    fn last_modified(&self, rel: &str) -> Option<DateTime<Utc>>;

    /// Short label for reports ("git" or "filesystem").
    fn kind(&self) -> &'static str;
}

fn mtime(root: &Path, rel: &str) -> Option<DateTime<Utc>> {
    let meta = std::fs::metadata(paths::absolute(root, rel)).ok()?;
    let modified = meta.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

// ---------------------------------------------------------------------------
// Filesystem mtimes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FsTimes {
    root: PathBuf,
}

impl FsTimes {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl RevisionSource for FsTimes {
    fn last_modified(&self, rel: &str) -> Option<DateTime<Utc>> {
        mtime(&self.root, rel)
    }

    fn kind(&self) -> &'static str {
        "filesystem"
    }
}

// ---------------------------------------------------------------------------
// Git history
// ---------------------------------------------------------------------------

impl RevisionSource for GitHistory {
    /// Commit time, except for uncommitted or untracked paths, which use mtime.
    fn last_modified(&self, rel: &str) -> Option<DateTime<Utc>> {
        if self.is_dirty(rel) {
            return mtime(&self.root, rel);
        }
        self.commit_time(rel).or_else(|| mtime(&self.root, rel))
    }

    fn kind(&self) -> &'static str {
        "git"
    }
}

// ---------------------------------------------------------------------------
// Fixed times
// ---------------------------------------------------------------------------

impl RevisionSource for BTreeMap<String, DateTime<Utc>> {
    fn last_modified(&self, rel: &str) -> Option<DateTime<Utc>> {
        self.get(rel).copied()
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }
}

/// Git history when `root` is inside a repository, filesystem mtimes otherwise.
pub fn revision_source(root: &Path) -> Box<dyn RevisionSource> {
    if git::git_available() && git::is_repository(root) {
        match GitHistory::load(root) {
            Ok(history) => return Box::new(history),
            Err(e) => tracing::warn!(error = %e, "git history unavailable, using file mtimes"),
        }
    } else {
        tracing::debug!(root = %root.display(), "not a git repository, using file mtimes");
    }
    Box::new(FsTimes::new(root))
}
