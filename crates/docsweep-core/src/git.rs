//! Thin wrapper over the `git` binary.
//!
//! Every command runs with the scan root as its working directory and uses
//! `--relative` where git supports it, so returned paths are relative to the
//! scan root even when that root is a subdirectory of the repository.

use crate::error::{DocsweepError, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::process::Command;

pub fn git_available() -> bool {
    which::which("git").is_ok()
}

fn run_git(root: &Path, args: &[&str]) -> Result<String> {
    if !git_available() {
        return Err(DocsweepError::GitUnavailable);
    }
    let output = Command::new("git")
        .args(["-c", "core.quotepath=off"])
        .args(args)
        .current_dir(root)
        .output()?;
    if !output.status.success() {
        return Err(DocsweepError::GitCommand {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn path_lines(stdout: &str) -> impl Iterator<Item = String> + '_ {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// True when `root` lies inside a git work tree.
pub fn is_repository(root: &Path) -> bool {
    run_git(root, &["rev-parse", "--is-inside-work-tree"])
        .map(|out| out.trim() == "true")
        .unwrap_or(false)
}

fn has_commits(root: &Path) -> bool {
    run_git(root, &["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
}

/// A `.git` directory (or worktree file) at `root` or any ancestor.
fn has_git_marker(root: &Path) -> bool {
    root.ancestors().any(|dir| dir.join(paths::GIT_DIR).exists())
}

fn require_repository(root: &Path) -> Result<()> {
    if !has_git_marker(root) {
        return Err(DocsweepError::NotAGitRepository(root.display().to_string()));
    }
    if !git_available() {
        return Err(DocsweepError::GitUnavailable);
    }
    if !is_repository(root) {
        return Err(DocsweepError::NotAGitRepository(root.display().to_string()));
    }
    Ok(())
}

/// Untracked, non-ignored files.
pub fn untracked(root: &Path) -> Result<Vec<String>> {
    let out = run_git(root, &["ls-files", "--others", "--exclude-standard"])?;
    Ok(path_lines(&out).collect())
}

/// Files that differ between `reference` and the working tree, plus untracked files.
pub fn changed_since(root: &Path, reference: &str) -> Result<Vec<String>> {
    require_repository(root)?;
    let spec = format!("{reference}^{{commit}}");
    if run_git(root, &["rev-parse", "--verify", "--quiet", &spec]).is_err() {
        return Err(DocsweepError::InvalidReference(reference.to_string()));
    }

    let mut changed: BTreeSet<String> = BTreeSet::new();
    let diff = run_git(root, &["diff", "--name-only", "--relative", reference, "--"])?;
    changed.extend(path_lines(&diff));
    changed.extend(untracked(root)?);
    Ok(changed.into_iter().collect())
}

/// Files touched by commits in the last `days` days, plus uncommitted and untracked files.
pub fn changed_within(root: &Path, days: u32) -> Result<Vec<String>> {
    require_repository(root)?;

    let mut changed: BTreeSet<String> = BTreeSet::new();
    if has_commits(root) {
        let since = format!("--since={days} days ago");
        let log = run_git(
            root,
            &["log", &since, "--name-only", "--relative", "--pretty=format:"],
        )?;
        changed.extend(path_lines(&log));

        let dirty = run_git(root, &["diff", "--name-only", "--relative", "HEAD", "--"])?;
        changed.extend(path_lines(&dirty));
    }
    changed.extend(untracked(root)?);
    Ok(changed.into_iter().collect())
}

// ---------------------------------------------------------------------------
// GitHistory
// ---------------------------------------------------------------------------

/// Most recent commit time per path, built from a single `git log` pass.
#[derive(Debug, Clone, Default)]
pub struct GitHistory {
    last_commit: HashMap<String, DateTime<Utc>>,
    /// Tracked paths with uncommitted edits; their commit time understates recency.
    dirty: HashSet<String>,
    pub(crate) root: std::path::PathBuf,
}

/// Emitted by `--format=%x01%ct` in front of each commit timestamp.
const COMMIT_MARKER: char = '\u{1}';

impl GitHistory {
    pub fn load(root: &Path) -> Result<Self> {
        require_repository(root)?;
        let mut history = GitHistory {
            last_commit: HashMap::new(),
            dirty: HashSet::new(),
            root: root.to_path_buf(),
        };
        if !has_commits(root) {
            return Ok(history);
        }

        let out = run_git(root, &["log", "--format=%x01%ct", "--name-only", "--relative"])?;
        history.last_commit = parse_log(&out);
        let dirty = run_git(root, &["diff", "--name-only", "--relative", "HEAD", "--"])?;
        history.dirty = path_lines(&dirty).collect();
        tracing::debug!(paths = history.last_commit.len(), "loaded git history");
        Ok(history)
    }

    pub fn commit_time(&self, rel: &str) -> Option<DateTime<Utc>> {
        self.last_commit.get(rel).copied()
    }

    pub fn is_dirty(&self, rel: &str) -> bool {
        self.dirty.contains(rel)
    }

    pub fn len(&self) -> usize {
        self.last_commit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_commit.is_empty()
    }
}

/// `git log` lists newest commits first, so the first time a path is seen
/// is its most recent commit.
fn parse_log(out: &str) -> HashMap<String, DateTime<Utc>> {
    let mut map = HashMap::new();
    let mut current: Option<DateTime<Utc>> = None;
    for line in out.lines() {
        if let Some(ts) = line.strip_prefix(COMMIT_MARKER) {
            current = ts
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            continue;
        }
        let path = line.trim();
        if path.is_empty() {
            continue;
        }
        if let Some(ts) = current {
            map.entry(path.to_string()).or_insert(ts);
        }
    }
    map
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    pub(crate) fn commit_at(dir: &Path, message: &str, date: &str) {
        git(dir, &["add", "-A"]);
        let status = Command::new("git")
            .args(["-c", "commit.gpgsign=false", "commit", "-q", "-m", message])
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .status()
            .unwrap();
        assert!(status.success(), "git commit failed");
    }

    pub(crate) fn init_repo(dir: &Path) {
        git(dir, &["init", "-q"]);
    }

    #[test]
    fn parse_log_keeps_newest_time() {
        let out = "\u{1}200\n\ndocs/a.md\nsrc/lib.rs\n\u{1}100\n\ndocs/a.md\ndocs/b.md\n";
        let map = parse_log(out);
        assert_eq!(map["docs/a.md"].timestamp(), 200);
        assert_eq!(map["src/lib.rs"].timestamp(), 200);
        assert_eq!(map["docs/b.md"].timestamp(), 100);
    }

    #[test]
    fn non_repository_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = changed_since(dir.path(), "HEAD").unwrap_err();
        assert!(matches!(err, DocsweepError::NotAGitRepository(_)));
        let err = changed_within(dir.path(), 7).unwrap_err();
        assert!(matches!(err, DocsweepError::NotAGitRepository(_)));
    }

    #[test]
    fn changed_within_window_includes_recent_dirty_and_untracked() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("old.md"), "# Old\n").unwrap();
        std::fs::write(dir.path().join("edited.md"), "# Edited\n").unwrap();
        commit_at(dir.path(), "old", "2020-01-01T00:00:00Z");

        std::fs::write(dir.path().join("recent.md"), "# Recent\n").unwrap();
        commit_at(dir.path(), "recent", &Utc::now().to_rfc3339());

        std::fs::write(dir.path().join("edited.md"), "# Edited again\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# Notes\n").unwrap();

        let changed = changed_within(dir.path(), 7).unwrap();
        assert_eq!(
            changed,
            vec![
                "edited.md".to_string(),
                "notes.md".to_string(),
                "recent.md".to_string()
            ]
        );
    }

    #[test]
    fn changed_since_reports_diff_and_untracked() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.md"), "# A\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "# B\n").unwrap();
        commit_at(dir.path(), "initial", "2024-01-01T00:00:00Z");
        git(dir.path(), &["tag", "v1"]);

        std::fs::write(dir.path().join("a.md"), "# A changed\n").unwrap();
        std::fs::write(dir.path().join("c.md"), "# C\n").unwrap();

        let changed = changed_since(dir.path(), "v1").unwrap();
        assert_eq!(changed, vec!["a.md".to_string(), "c.md".to_string()]);
    }

    #[test]
    fn changed_since_unknown_ref() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.md"), "# A\n").unwrap();
        commit_at(dir.path(), "initial", "2024-01-01T00:00:00Z");
        let err = changed_since(dir.path(), "no-such-tag").unwrap_err();
        assert!(matches!(err, DocsweepError::InvalidReference(_)));
    }

    #[test]
    fn history_records_last_commit_per_path() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.md"), "# A\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "# B\n").unwrap();
        commit_at(dir.path(), "one", "2024-01-01T00:00:00Z");
        std::fs::write(dir.path().join("b.md"), "# B2\n").unwrap();
        commit_at(dir.path(), "two", "2024-03-01T00:00:00Z");

        let history = GitHistory::load(dir.path()).unwrap();
        let a = history.commit_time("a.md").unwrap();
        let b = history.commit_time("b.md").unwrap();
        assert!(b > a);
        assert_eq!(a.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn history_of_empty_repository_is_empty() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        let history = GitHistory::load(dir.path()).unwrap();
        assert!(history.is_empty());
    }
}
