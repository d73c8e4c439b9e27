//! Corpus discovery and scan scoping.
//!
//! Discovery always walks the whole tree, because link resolution needs every
//! target. The scan mode only narrows the *focus*: the set of documents whose
//! findings get reported.

use crate::config::{compile_globs, CorpusConfig};
use crate::error::Result;
use crate::git;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

// ---------------------------------------------------------------------------
// ScanMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanMode {
    Full,
    /// Files changed since a git reference (tag, branch or commit).
    SinceRef { reference: String },
    /// Files changed within the last `days` days.
    Window { days: u32 },
}

impl ScanMode {
    pub fn is_incremental(&self) -> bool {
        !matches!(self, ScanMode::Full)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Full => f.write_str("full"),
            ScanMode::SinceRef { reference } => write!(f, "since {reference}"),
            ScanMode::Window { days } => write!(f, "last {days} days"),
        }
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Corpus {
    pub root: PathBuf,
    /// Root-relative document paths, sorted.
    pub documents: Vec<String>,
}

fn is_skipped_dir(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && skip_dirs
            .iter()
            .any(|d| entry.file_name().to_string_lossy() == d.as_str())
}

impl Corpus {
    pub fn discover(root: &Path, config: &CorpusConfig) -> Result<Corpus> {
        let include = compile_globs(&config.include)?;
        let exclude = compile_globs(&config.exclude)?;

        let mut documents = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e, &config.skip_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = paths::normalize_rel(rel);
            if !include.is_match(&rel) || exclude.is_match(&rel) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > config.max_file_size {
                tracing::warn!(path = %rel, size, "skipping oversized document");
                continue;
            }
            documents.push(rel);
        }

        documents.sort();
        tracing::debug!(count = documents.len(), "discovered documents");
        Ok(Corpus {
            root: root.to_path_buf(),
            documents,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.documents.binary_search_by(|d| d.as_str().cmp(rel)).is_ok()
    }
}

// ---------------------------------------------------------------------------
// ScanScope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanScope {
    pub mode: ScanMode,
    /// Every changed path, documents and sources alike. Empty for full scans.
    pub changed: BTreeSet<String>,
    /// Documents whose findings are reported.
    pub focus: BTreeSet<String>,
}

impl ScanScope {
    pub fn full(corpus: &Corpus) -> ScanScope {
        ScanScope {
            mode: ScanMode::Full,
            changed: BTreeSet::new(),
            focus: corpus.documents.iter().cloned().collect(),
        }
    }

    pub fn resolve(root: &Path, mode: ScanMode, corpus: &Corpus) -> Result<ScanScope> {
        let changed: BTreeSet<String> = match &mode {
            ScanMode::Full => return Ok(Self::full(corpus)),
            ScanMode::SinceRef { reference } => git::changed_since(root, reference)?,
            ScanMode::Window { days } => git::changed_within(root, *days)?,
        }
        .into_iter()
        .collect();

        let focus = changed
            .iter()
            .filter(|p| corpus.contains(p))
            .cloned()
            .collect();
        Ok(ScanScope {
            mode,
            changed,
            focus,
        })
    }

    pub fn in_focus(&self, rel: &str) -> bool {
        self.focus.contains(rel)
    }

    pub fn changed(&self, rel: &str) -> bool {
        self.changed.contains(rel)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
