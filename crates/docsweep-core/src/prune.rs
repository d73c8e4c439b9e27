use crate::config::Config;
use crate::error::Result;
use crate::io;
use crate::orphans::OrphanReport;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPrune {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneOutcome {
    /// Files removed, or that would be removed on a dry run.
    pub removed: Vec<String>,
    /// Directories left empty by the removals and deleted with them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_dirs: Vec<String>,
    pub skipped: Vec<SkippedPrune>,
    pub dry_run: bool,
}

/// Delete orphan candidates. Without `apply` nothing on disk changes.
///
/// Protected and root documents are re-checked against `config` here, so a
/// stale or hand-edited report can never delete them.
pub fn prune(root: &Path, config: &Config, report: &OrphanReport, apply: bool) -> Result<PruneOutcome> {
    let protected = config.protected_set()?;
    let mut outcome = PruneOutcome {
        dry_run: !apply,
        ..PruneOutcome::default()
    };

    for candidate in &report.candidates {
        let rel = candidate.path.as_str();
        let skip = |reason: &str| SkippedPrune {
            path: rel.to_string(),
            reason: reason.to_string(),
        };
        if protected.is_match(rel) {
            outcome.skipped.push(skip("protected"));
            continue;
        }
        if config.roots.iter().any(|r| r == rel) || report.roots.iter().any(|r| r == rel) {
            outcome.skipped.push(skip("root document"));
            continue;
        }
        if paths::resolve_link_path("", rel).ok().as_deref() != Some(rel) {
            outcome.skipped.push(skip("not a normalized root-relative path"));
            continue;
        }
        let abs = paths::absolute(root, rel);
        if !abs.is_file() {
            outcome.skipped.push(skip("no longer exists"));
            continue;
        }

        if apply {
            std::fs::remove_file(&abs)?;
            tracing::info!(path = %rel, "removed orphaned document");
            if let Some(parent) = abs.parent() {
                for dir in io::remove_empty_dirs(parent, root)? {
                    if let Ok(d) = dir.strip_prefix(root) {
                        outcome.removed_dirs.push(paths::normalize_rel(d));
                    }
                }
            }
        }
        outcome.removed.push(rel.to_string());
    }
    Ok(outcome)
}
