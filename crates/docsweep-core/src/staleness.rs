//! Staleness Scorer: documents whose referenced source files changed after
//! the document itself last did.

use crate::config::{compile_globs, Config};
use crate::corpus::ScanScope;
use crate::document::{Document, LinkTarget};
use crate::error::Result;
use crate::index::DocumentIndex;
use crate::paths;
use crate::revision::RevisionSource;
use chrono::{DateTime, Duration, Utc};
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleDocument {
    pub path: String,
    pub doc_modified: DateTime<Utc>,
    pub newest_source: String,
    pub source_modified: DateTime<Utc>,
    pub lag_days: f64,
    /// Every referenced source modified after the document.
    pub changed_sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaleReport {
    /// Where modification times came from ("git" or "filesystem").
    pub revision_source: String,
    /// Documents with at least one referenced source.
    pub with_sources: usize,
    pub stale: Vec<StaleDocument>,
}

// ---------------------------------------------------------------------------
// Source discovery
// ---------------------------------------------------------------------------

fn is_file(root: &Path, rel: &str) -> bool {
    paths::absolute(root, rel).is_file()
}

fn is_source(root: &Path, rel: &str) -> bool {
    !paths::is_markdown(rel) && is_file(root, rel)
}

struct Mapping {
    docs: GlobSet,
    sources: GlobSet,
}

/// Every non-document file under `root`, for matching mapping globs.
fn source_files(root: &Path, skip_dirs: &[String]) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !skip_dirs.iter().any(|d| e.file_name().to_string_lossy() == d.as_str())
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(paths::normalize_rel))
        .filter(|rel| !paths::is_markdown(rel))
        .collect();
    files.sort();
    files
}

pub struct SourceResolver<'a> {
    root: &'a Path,
    detect_mentions: bool,
    mappings: Vec<Mapping>,
    files: Vec<String>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(root: &'a Path, config: &Config) -> Result<Self> {
        let mut mappings = Vec::new();
        for m in &config.staleness.mappings {
            mappings.push(Mapping {
                docs: compile_globs(std::slice::from_ref(&m.docs))?,
                sources: compile_globs(&m.sources)?,
            });
        }
        let files = if mappings.is_empty() {
            Vec::new()
        } else {
            source_files(root, &config.corpus.skip_dirs)
        };
        Ok(SourceResolver {
            root,
            detect_mentions: config.staleness.detect_mentions,
            mappings,
            files,
        })
    }

    /// Root-relative source files `doc` references.
    pub fn sources(&self, doc: &Document) -> BTreeSet<String> {
        let mut out = BTreeSet::new();

        for link in &doc.links {
            if let LinkTarget::Local { path, .. } = &link.target {
                if is_source(self.root, path) {
                    out.insert(path.clone());
                }
            }
        }

        if self.detect_mentions {
            for mention in &doc.mentions {
                if let Some(rel) = self.resolve_mention(&doc.path, &mention.token) {
                    out.insert(rel);
                }
            }
        }

        for mapping in &self.mappings {
            if mapping.docs.is_match(&doc.path) {
                out.extend(
                    self.files
                        .iter()
                        .filter(|f| mapping.sources.is_match(f.as_str()))
                        .cloned(),
                );
            }
        }
        out
    }

    /// Mentions resolve root-relative first, then relative to the document.
    fn resolve_mention(&self, doc: &str, token: &str) -> Option<String> {
        let rooted = paths::resolve_link_path("", token).ok();
        let relative = paths::resolve_link_path(doc, token).ok();
        [rooted, relative]
            .into_iter()
            .flatten()
            .find(|rel| is_source(self.root, rel))
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn days(d: Duration) -> f64 {
    (d.num_seconds() as f64 / 86_400.0 * 10.0).round() / 10.0
}

pub fn analyze(
    index: &DocumentIndex,
    config: &Config,
    revisions: &dyn RevisionSource,
    scope: &ScanScope,
) -> Result<StaleReport> {
    let resolver = SourceResolver::new(index.root(), config)?;
    let min_lag = Duration::days(i64::from(config.staleness.min_lag_days));

    let mut report = StaleReport {
        revision_source: revisions.kind().to_string(),
        ..StaleReport::default()
    };

    for doc in index.iter() {
        let sources = resolver.sources(doc);
        if sources.is_empty() {
            continue;
        }
        report.with_sources += 1;

        let in_scope = scope.in_focus(&doc.path) || sources.iter().any(|s| scope.changed(s));
        if !in_scope {
            continue;
        }

        let Some(doc_modified) = revisions.last_modified(&doc.path) else {
            continue;
        };
        let timed: Vec<(&String, DateTime<Utc>)> = sources
            .iter()
            .filter_map(|s| revisions.last_modified(s).map(|t| (s, t)))
            .collect();
        // Latest time wins; equal times resolve to the first path in order.
        let Some((newest, source_modified)) = timed
            .iter()
            .fold(None::<(&String, DateTime<Utc>)>, |best, &(s, t)| match best {
                Some((_, bt)) if bt >= t => best,
                _ => Some((s, t)),
            })
        else {
            continue;
        };

        let lag = source_modified - doc_modified;
        if lag <= Duration::zero() || lag <= min_lag {
            continue;
        }

        report.stale.push(StaleDocument {
            path: doc.path.clone(),
            doc_modified,
            newest_source: newest.clone(),
            source_modified,
            lag_days: days(lag),
            changed_sources: timed
                .iter()
                .filter(|(_, t)| *t > doc_modified)
                .map(|(s, _)| (*s).clone())
                .collect(),
        });
    }

    report.stale.sort_by(|a, b| {
        b.lag_days
            .total_cmp(&a.lag_days)
            .then_with(|| a.path.cmp(&b.path))
    });
    tracing::debug!(
        with_sources = report.with_sources,
        stale = report.stale.len(),
        source = %report.revision_source,
        "scored staleness"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceMapping;
    use crate::corpus::{Corpus, ScanMode};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/config.md", "See [loader](../src/config.rs) and `src/cli.rs`.\n");
        write(dir.path(), "docs/fresh.md", "Covers src/cli.rs only.\n");
        write(dir.path(), "docs/plain.md", "No sources here.\n");
        write(dir.path(), "src/config.rs", "// config");
        write(dir.path(), "src/cli.rs", "// cli");
        dir
    }

    fn run(dir: &Path, config: &Config, revs: &BTreeMap<String, DateTime<Utc>>, scope: Option<ScanScope>) -> StaleReport {
        let corpus = Corpus::discover(dir, &config.corpus).unwrap();
        let index = DocumentIndex::build(dir, &corpus).unwrap();
        let scope = scope.unwrap_or_else(|| ScanScope::full(&corpus));
        analyze(&index, config, revs, &scope).unwrap()
    }

    fn times() -> BTreeMap<String, DateTime<Utc>> {
        [
            ("docs/config.md", "2024-01-01T00:00:00Z"),
            ("docs/fresh.md", "2024-06-01T00:00:00Z"),
            ("docs/plain.md", "2020-01-01T00:00:00Z"),
            ("src/config.rs", "2024-03-01T00:00:00Z"),
            ("src/cli.rs", "2024-01-11T00:00:00Z"),
        ]
        .into_iter()
        .map(|(p, t)| (p.to_string(), at(t)))
        .collect()
    }

    #[test]
    fn sources_from_links_and_mentions() {
        let dir = fixture();
        let config = Config::default();
        let resolver = SourceResolver::new(dir.path(), &config).unwrap();
        let doc = Document::parse(
            "docs/config.md",
            "See [loader](../src/config.rs) and `src/cli.rs` and [other](plain.md).\n",
        );
        let sources: Vec<String> = resolver.sources(&doc).into_iter().collect();
        assert_eq!(sources, vec!["src/cli.rs", "src/config.rs"]);
    }

    #[test]
    fn stale_when_source_newer() {
        let dir = fixture();
        let report = run(dir.path(), &Config::default(), &times(), None);
        assert_eq!(report.with_sources, 2);
        assert_eq!(report.stale.len(), 1);
        let stale = &report.stale[0];
        assert_eq!(stale.path, "docs/config.md");
        assert_eq!(stale.newest_source, "src/config.rs");
        assert_eq!(stale.lag_days, 60.0);
        assert_eq!(stale.changed_sources, vec!["src/cli.rs", "src/config.rs"]);
    }

    #[test]
    fn min_lag_days_suppresses_small_lags() {
        let dir = fixture();
        let mut config = Config::default();
        config.staleness.min_lag_days = 90;
        assert!(run(dir.path(), &config, &times(), None).stale.is_empty());
    }

    #[test]
    fn mentions_can_be_disabled() {
        let dir = fixture();
        let mut config = Config::default();
        config.staleness.detect_mentions = false;
        let report = run(dir.path(), &config, &times(), None);
        assert_eq!(report.with_sources, 1);
        assert_eq!(report.stale[0].changed_sources, vec!["src/config.rs"]);
    }

    #[test]
    fn mappings_correlate_unmentioned_sources() {
        let dir = fixture();
        let mut config = Config::default();
        config.staleness.mappings.push(SourceMapping {
            docs: "docs/plain.md".to_string(),
            sources: vec!["src/**/*.rs".to_string()],
        });
        let report = run(dir.path(), &config, &times(), None);
        let plain = report.stale.iter().find(|s| s.path == "docs/plain.md").unwrap();
        assert_eq!(plain.changed_sources.len(), 2);
        assert_eq!(report.stale[0].path, "docs/plain.md");
    }

    #[test]
    fn incremental_scope_includes_docs_with_changed_sources() {
        let dir = fixture();
        let config = Config::default();
        let scope = ScanScope {
            mode: ScanMode::Window { days: 7 },
            changed: ["src/config.rs".to_string()].into_iter().collect(),
            focus: BTreeSet::new(),
        };
        let report = run(dir.path(), &config, &times(), Some(scope));
        assert_eq!(report.stale.len(), 1);

        let scope = ScanScope {
            mode: ScanMode::Window { days: 7 },
            changed: ["docs/plain.md".to_string()].into_iter().collect(),
            focus: ["docs/plain.md".to_string()].into_iter().collect(),
        };
        assert!(run(dir.path(), &config, &times(), Some(scope)).stale.is_empty());
    }
}
