//! Link Resolver: verifies every local link and anchor in the focus documents.

use crate::config::{compile_globs, LinkConfig};
use crate::document::{Document, Link, LinkTarget};
use crate::error::Result;
use crate::index::DocumentIndex;
use crate::paths;
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenKind {
    MissingFile,
    MissingAnchor,
    OutsideRoot,
    Placeholder,
}

impl fmt::Display for BrokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrokenKind::MissingFile => "missing file",
            BrokenKind::MissingAnchor => "missing anchor",
            BrokenKind::OutsideRoot => "outside root",
            BrokenKind::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub source: String,
    pub line: usize,
    pub raw: String,
    pub kind: BrokenKind,
    /// Root-relative resolution of the target, when it resolved at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkReport {
    /// Local and anchor links examined.
    pub checked: usize,
    /// External links counted but never fetched.
    pub external: usize,
    pub broken: Vec<BrokenLink>,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.broken.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

const PLACEHOLDER_WORDS: &[&str] = &["todo", "tbd", "fixme", "xxx", "link", "url"];

/// Targets that were never filled in: `TODO`, `path/to/...`, `<...>`, `...`.
pub fn is_placeholder(raw: &str) -> bool {
    let t = raw.trim();
    let lower = t.to_ascii_lowercase();
    PLACEHOLDER_WORDS.contains(&lower.as_str())
        || lower.starts_with("path/to/")
        || lower.contains("...")
        || (t.starts_with('<') && t.ends_with('>'))
}

// ---------------------------------------------------------------------------
// LinkResolver
// ---------------------------------------------------------------------------

pub struct LinkResolver<'a> {
    index: &'a DocumentIndex,
    ignore: GlobSet,
    check_anchors: bool,
}

impl<'a> LinkResolver<'a> {
    pub fn new(index: &'a DocumentIndex, config: &LinkConfig) -> Result<Self> {
        Ok(LinkResolver {
            index,
            ignore: compile_globs(&config.ignore)?,
            check_anchors: config.check_anchors,
        })
    }

    /// Check the links of every document in `focus`.
    pub fn check(&self, focus: &BTreeSet<String>) -> LinkReport {
        let mut report = LinkReport::default();
        for doc in self.index.iter().filter(|d| focus.contains(&d.path)) {
            for link in &doc.links {
                if matches!(link.target, LinkTarget::External { .. }) {
                    report.external += 1;
                    continue;
                }
                if self.ignore.is_match(&link.raw) {
                    continue;
                }
                report.checked += 1;
                if let Some(broken) = self.check_link(doc, link) {
                    report.broken.push(broken);
                }
            }
        }
        report.broken.sort_by(|a, b| {
            (a.source.as_str(), a.line, a.raw.as_str()).cmp(&(b.source.as_str(), b.line, b.raw.as_str()))
        });
        tracing::debug!(
            checked = report.checked,
            broken = report.broken.len(),
            "resolved links"
        );
        report
    }

    fn check_link(&self, doc: &Document, link: &Link) -> Option<BrokenLink> {
        let broken = |kind: BrokenKind, resolved: Option<&str>, suggestion: Option<String>| BrokenLink {
            source: doc.path.clone(),
            line: link.line,
            raw: link.raw.clone(),
            kind,
            resolved: resolved.map(str::to_string),
            suggestion,
        };

        if is_placeholder(&link.raw) {
            return Some(broken(BrokenKind::Placeholder, None, None));
        }

        match &link.target {
            LinkTarget::External { .. } => None,
            LinkTarget::OutsideRoot { .. } => Some(broken(BrokenKind::OutsideRoot, None, None)),
            LinkTarget::Anchor { anchor } => {
                if self.check_anchors && !doc.has_anchor(anchor) {
                    let suggestion = closest_anchor(doc, anchor).map(|a| format!("#{a}"));
                    Some(broken(BrokenKind::MissingAnchor, Some(&doc.path), suggestion))
                } else {
                    None
                }
            }
            LinkTarget::Local { path, anchor } => {
                let abs = paths::absolute(self.index.root(), path);
                if !abs.exists() {
                    let suggestion = self.suggest_file(&doc.path, path, anchor.as_deref());
                    return Some(broken(BrokenKind::MissingFile, Some(path), suggestion));
                }
                let anchor = anchor.as_deref()?;
                if !self.check_anchors || !paths::is_markdown(path) {
                    return None;
                }
                let target = self.index.get(path)?;
                if target.has_anchor(anchor) {
                    None
                } else {
                    let suggestion = closest_anchor(target, anchor)
                        .map(|a| format!("{}#{a}", paths::relative_link(&doc.path, path)));
                    Some(broken(BrokenKind::MissingAnchor, Some(path), suggestion))
                }
            }
        }
    }

    /// A relative link to the only indexed document sharing the missing
    /// target's file name.
    fn suggest_file(&self, source: &str, missing: &str, anchor: Option<&str>) -> Option<String> {
        let candidates = self.index.by_file_name(paths::file_name(missing));
        let [only] = candidates.as_slice() else {
            return None;
        };
        let mut link = paths::relative_link(source, only);
        if let Some(a) = anchor {
            link.push('#');
            link.push_str(a);
        }
        Some(link)
    }
}

/// An existing anchor that differs from `wanted` only by a numeric suffix or
/// by prefix, e.g. `#install` vs `#installation`.
fn closest_anchor<'d>(doc: &'d Document, wanted: &str) -> Option<&'d str> {
    let wanted = wanted.to_lowercase();
    let mut matches = doc
        .anchors()
        .filter(|a| a.starts_with(&wanted) || wanted.starts_with(*a));
    let first = matches.next()?;
    match matches.next() {
        None => Some(first),
        Some(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
