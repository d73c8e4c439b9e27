//! Analysis driver and the verification gate.

use crate::config::Config;
use crate::corpus::{Corpus, ScanMode, ScanScope};
use crate::duplicates::{self, DuplicateReport};
use crate::error::{DocsweepError, Result};
use crate::index::DocumentIndex;
use crate::links::{BrokenKind, LinkReport, LinkResolver};
use crate::orphans::{self, OrphanReport};
use crate::revision::{revision_source, RevisionSource};
use crate::staleness::{self, StaleReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stale documents lagging their sources by more than this many days are
/// reported at medium severity instead of low.
pub const STALE_MEDIUM_DAYS: f64 = 30.0;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::High => 2,
            Severity::Medium => 1,
            Severity::Low => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn at_least(self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = DocsweepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(DocsweepError::UnknownSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    BrokenLink,
    Duplicate,
    Stale,
    Orphan,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingKind::BrokenLink => "broken_link",
            FindingKind::Duplicate => "duplicate",
            FindingKind::Stale => "stale",
            FindingKind::Orphan => "orphan",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Finding {
    /// `path:line`, or just `path` for whole-document findings.
    pub fn location(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{line}", self.path),
            None => self.path.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub mode: ScanMode,
    pub documents: usize,
    /// Documents in focus for incremental scans. Empty for full scans, where
    /// every document is in focus.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub focus: BTreeSet<String>,
    pub links: LinkReport,
    pub duplicates: DuplicateReport,
    pub stale: StaleReport,
    pub orphans: OrphanReport,
}

fn broken_severity(kind: BrokenKind) -> Severity {
    match kind {
        BrokenKind::MissingFile => Severity::High,
        BrokenKind::MissingAnchor | BrokenKind::OutsideRoot => Severity::Medium,
        BrokenKind::Placeholder => Severity::Low,
    }
}

impl Report {
    pub fn in_focus(&self, rel: &str) -> bool {
        !self.mode.is_incremental() || self.focus.contains(rel)
    }

    /// Every finding, most severe first, then by location.
    pub fn findings(&self) -> Vec<Finding> {
        let mut out = Vec::new();

        for b in &self.links.broken {
            let mut message = format!("{} link `{}`", b.kind, b.raw);
            if let Some(s) = &b.suggestion {
                message.push_str(&format!(" (did you mean `{s}`?)"));
            }
            out.push(Finding {
                kind: FindingKind::BrokenLink,
                severity: broken_severity(b.kind),
                path: b.source.clone(),
                line: Some(b.line),
                message,
            });
        }

        for cluster in &self.duplicates.clusters {
            let before = out.len();
            for p in cluster.redundant().filter(|p| self.in_focus(&p.path)) {
                out.push(Finding {
                    kind: FindingKind::Duplicate,
                    severity: Severity::Medium,
                    path: p.path.clone(),
                    line: Some(p.line),
                    message: format!(
                        "duplicates {}:{} (similarity {:.2})",
                        cluster.authoritative, cluster.authoritative_line, cluster.mean_similarity
                    ),
                });
            }
            // Only the authoritative copy is in focus: report the cluster there.
            if out.len() == before && self.in_focus(&cluster.authoritative) {
                out.push(Finding {
                    kind: FindingKind::Duplicate,
                    severity: Severity::Medium,
                    path: cluster.authoritative.clone(),
                    line: Some(cluster.authoritative_line),
                    message: format!(
                        "copied in {} other passage(s)",
                        cluster.passages.len().saturating_sub(1)
                    ),
                });
            }
        }

        for s in &self.stale.stale {
            out.push(Finding {
                kind: FindingKind::Stale,
                severity: if s.lag_days > STALE_MEDIUM_DAYS {
                    Severity::Medium
                } else {
                    Severity::Low
                },
                path: s.path.clone(),
                line: None,
                message: format!("{} changed {} days after this document", s.newest_source, s.lag_days),
            });
        }

        for c in &self.orphans.candidates {
            let message = if self.orphans.roots.is_empty() {
                "no other document links here".to_string()
            } else {
                "not reachable from any root document".to_string()
            };
            out.push(Finding {
                kind: FindingKind::Orphan,
                severity: Severity::Low,
                path: c.path.clone(),
                line: None,
                message,
            });
        }

        out.sort_by(|a, b| {
            b.severity
                .rank()
                .cmp(&a.severity.rank())
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.line.cmp(&b.line))
        });
        out
    }

    /// True when no finding is at or above `threshold`.
    pub fn passes(&self, threshold: Severity) -> bool {
        !self.findings().iter().any(|f| f.severity.at_least(threshold))
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Discovery and indexing done once, shared by every analyzer.
pub struct Analysis {
    pub root: PathBuf,
    pub config: Config,
    pub corpus: Corpus,
    pub scope: ScanScope,
    pub index: DocumentIndex,
    revisions: Box<dyn RevisionSource>,
}

impl Analysis {
    pub fn prepare(root: &Path, config: &Config, mode: ScanMode) -> Result<Analysis> {
        let corpus = Corpus::discover(root, &config.corpus)?;
        let scope = ScanScope::resolve(root, mode, &corpus)?;
        let index = DocumentIndex::build(root, &corpus)?;
        let revisions = revision_source(root);
        tracing::info!(
            documents = index.len(),
            focus = scope.focus.len(),
            mode = %scope.mode,
            "prepared analysis"
        );
        Ok(Analysis {
            root: root.to_path_buf(),
            config: config.clone(),
            corpus,
            scope,
            index,
            revisions,
        })
    }

    pub fn revisions(&self) -> &dyn RevisionSource {
        self.revisions.as_ref()
    }

    pub fn links(&self) -> Result<LinkReport> {
        Ok(LinkResolver::new(&self.index, &self.config.links)?.check(&self.scope.focus))
    }

    pub fn duplicates(&self) -> Result<DuplicateReport> {
        duplicates::detect(
            &self.index,
            &self.config.duplicates,
            self.revisions(),
            &self.scope.focus,
        )
    }

    pub fn staleness(&self) -> Result<StaleReport> {
        staleness::analyze(&self.index, &self.config, self.revisions(), &self.scope)
    }

    pub fn orphans(&self) -> Result<OrphanReport> {
        orphans::analyze(&self.index, &self.config, &self.scope.focus)
    }

    pub fn report(&self) -> Result<Report> {
        Ok(Report {
            mode: self.scope.mode.clone(),
            documents: self.index.len(),
            focus: if self.scope.mode.is_incremental() {
                self.scope.focus.clone()
            } else {
                BTreeSet::new()
            },
            links: self.links()?,
            duplicates: self.duplicates()?,
            stale: self.staleness()?,
            orphans: self.orphans()?,
        })
    }

    pub fn run(root: &Path, config: &Config, mode: ScanMode) -> Result<Report> {
        Self::prepare(root, config, mode)?.report()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn severity_parse_and_order() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
        assert!(Severity::Critical.at_least(Severity::High));
        assert!(Severity::High.at_least(Severity::High));
        assert!(!Severity::Low.at_least(Severity::Medium));
    }

    #[test]
    fn empty_corpus_passes() {
        let dir = TempDir::new().unwrap();
        let report = Analysis::run(dir.path(), &Config::default(), ScanMode::Full).unwrap();
        assert_eq!(report.documents, 0);
        assert!(report.findings().is_empty());
        assert!(report.passes(Severity::Low));
    }

    #[test]
    fn findings_are_ranked_by_severity() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "# Root\n\n[gone](missing.md)\n\n[later](TODO)\n");
        write(dir.path(), "lonely.md", "# Lonely\n");
        let report = Analysis::run(dir.path(), &Config::default(), ScanMode::Full).unwrap();
        let findings = report.findings();
        let summary: Vec<(FindingKind, Severity, String)> = findings
            .iter()
            .map(|f| (f.kind, f.severity, f.location()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (FindingKind::BrokenLink, Severity::High, "README.md:3".to_string()),
                (FindingKind::BrokenLink, Severity::Low, "README.md:5".to_string()),
                (FindingKind::Orphan, Severity::Low, "lonely.md".to_string()),
            ]
        );
        assert!(!report.passes(Severity::High));
        assert!(report.passes(Severity::Critical));
    }

    #[test]
    fn duplicate_findings_point_at_redundant_copies() {
        let dir = TempDir::new().unwrap();
        let para = "Configure the cache directory by setting the environment variable before \
                    starting the service so every worker shares the same location on disk.";
        write(dir.path(), "README.md", "[a](docs/cache.md) [b](notes.md)\n");
        let extra = "word ".repeat(80);
        write(dir.path(), "docs/cache.md", &format!("# Cache\n\n{para}\n\n{extra}\n"));
        write(dir.path(), "notes.md", &format!("{para}\n"));
        let report = Analysis::run(dir.path(), &Config::default(), ScanMode::Full).unwrap();
        let dupes: Vec<Finding> = report
            .findings()
            .into_iter()
            .filter(|f| f.kind == FindingKind::Duplicate)
            .collect();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].path, "notes.md");
        assert!(dupes[0].message.contains("docs/cache.md:3"));
        assert!(report.passes(Severity::High));
        assert!(!report.passes(Severity::Medium));
    }

    #[test]
    fn incremental_report_limits_duplicates_to_focus() {
        let report = Report {
            mode: ScanMode::Window { days: 3 },
            documents: 2,
            focus: ["docs/cache.md".to_string()].into_iter().collect(),
            links: LinkReport::default(),
            duplicates: DuplicateReport {
                paragraphs_considered: 2,
                clusters: vec![crate::duplicates::DuplicateCluster {
                    passages: vec![
                        crate::duplicates::Passage {
                            path: "docs/cache.md".to_string(),
                            line: 3,
                            word_count: 20,
                            excerpt: String::new(),
                            score: 0.9,
                        },
                        crate::duplicates::Passage {
                            path: "notes.md".to_string(),
                            line: 1,
                            word_count: 20,
                            excerpt: String::new(),
                            score: 0.5,
                        },
                    ],
                    authoritative: "docs/cache.md".to_string(),
                    authoritative_line: 3,
                    min_similarity: 1.0,
                    mean_similarity: 1.0,
                }],
            },
            stale: StaleReport::default(),
            orphans: OrphanReport::default(),
        };
        let findings = report.findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "docs/cache.md");
    }
}
