//! Orphan/Prune Analyzer: documents nothing leads to.

use crate::config::Config;
use crate::error::Result;
use crate::index::DocumentIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanBasis {
    /// Unreachable from every configured root document.
    Reachability,
    /// No configured root is indexed; orphans are documents no other document links to.
    NoInboundLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanCandidate {
    pub path: String,
    /// Links from other documents (these come from documents that are
    /// themselves unreachable).
    pub inbound: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanReport {
    pub basis: OrphanBasis,
    pub roots: Vec<String>,
    pub reachable: usize,
    pub candidates: Vec<OrphanCandidate>,
    /// Would-be candidates kept by the `protected` allow-list.
    pub protected: Vec<String>,
}

impl Default for OrphanReport {
    fn default() -> Self {
        OrphanReport {
            basis: OrphanBasis::Reachability,
            roots: Vec::new(),
            reachable: 0,
            candidates: Vec::new(),
            protected: Vec::new(),
        }
    }
}

/// Breadth-first walk over document links from `roots`.
pub fn reachable_from<'a>(index: &'a DocumentIndex, roots: &[&'a str]) -> BTreeSet<&'a str> {
    let mut seen: BTreeSet<&str> = roots.iter().copied().collect();
    let mut queue: VecDeque<&str> = roots.iter().copied().collect();
    while let Some(current) = queue.pop_front() {
        for next in index.outbound_docs(current) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

pub fn analyze(
    index: &DocumentIndex,
    config: &Config,
    focus: &BTreeSet<String>,
) -> Result<OrphanReport> {
    let protected = config.protected_set()?;
    let roots: Vec<&str> = config
        .roots
        .iter()
        .filter_map(|r| index.get(r).map(|d| d.path.as_str()))
        .collect();
    let inbound = index.inbound_counts();

    let (basis, reachable) = if roots.is_empty() {
        let linked: BTreeSet<&str> = inbound
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(p, _)| *p)
            .collect();
        (OrphanBasis::NoInboundLinks, linked)
    } else {
        (OrphanBasis::Reachability, reachable_from(index, &roots))
    };

    let mut report = OrphanReport {
        basis,
        roots: roots.iter().map(|r| r.to_string()).collect(),
        reachable: reachable.len(),
        ..OrphanReport::default()
    };

    for doc in index.iter() {
        let path = doc.path.as_str();
        if reachable.contains(path) || roots.contains(&path) || !focus.contains(path) {
            continue;
        }
        if protected.is_match(path) {
            report.protected.push(path.to_string());
            continue;
        }
        report.candidates.push(OrphanCandidate {
            path: path.to_string(),
            inbound: inbound.get(path).copied().unwrap_or(0),
            word_count: doc.word_count,
        });
    }

    tracing::debug!(
        basis = ?report.basis,
        reachable = report.reachable,
        candidates = report.candidates.len(),
        "orphan analysis"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
