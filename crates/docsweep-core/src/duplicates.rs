//! Duplicate Detector: near-duplicate paragraphs across documents.
//!
//! Each paragraph gets a MinHash signature over word shingles. LSH banding
//! proposes candidate pairs, which are kept when their estimated Jaccard
//! similarity clears the threshold. Connected pairs form clusters, and each
//! cluster names the passage the others should be folded into.

use crate::config::DuplicateConfig;
use crate::document::{tokens, Document, Paragraph};
use crate::error::{DocsweepError, Result};
use crate::index::DocumentIndex;
use crate::paths;
use crate::revision::RevisionSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

const EXCERPT_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub path: String,
    pub line: usize,
    pub word_count: usize,
    pub excerpt: String,
    /// Authoritative-source score in `[0, 1]`.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Passages ordered by path, then line. Always spans two or more files.
    pub passages: Vec<Passage>,
    pub authoritative: String,
    pub authoritative_line: usize,
    pub min_similarity: f64,
    pub mean_similarity: f64,
}

impl DuplicateCluster {
    pub fn files(&self) -> BTreeSet<&str> {
        self.passages.iter().map(|p| p.path.as_str()).collect()
    }

    /// Passages other than the authoritative one.
    pub fn redundant(&self) -> impl Iterator<Item = &Passage> {
        self.passages
            .iter()
            .filter(|p| !(p.path == self.authoritative && p.line == self.authoritative_line))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub paragraphs_considered: usize,
    pub clusters: Vec<DuplicateCluster>,
}

// ---------------------------------------------------------------------------
// MinHash
// ---------------------------------------------------------------------------

/// Word `size`-grams of `text`, or the whole text when it is shorter.
pub fn shingles(text: &str, size: usize) -> BTreeSet<String> {
    let words = tokens(text);
    if words.is_empty() {
        return BTreeSet::new();
    }
    if words.len() <= size {
        return std::iter::once(words.join(" ")).collect();
    }
    words.windows(size).map(|w| w.join(" ")).collect()
}

pub fn minhash(shingles: &BTreeSet<String>, num_hashes: usize) -> Vec<u64> {
    let mut signature = vec![u64::MAX; num_hashes];
    for shingle in shingles {
        let base = xxh3_64(shingle.as_bytes()).to_le_bytes();
        for (seed, slot) in signature.iter_mut().enumerate() {
            let h = xxh3_64_with_seed(&base, seed as u64);
            if h < *slot {
                *slot = h;
            }
        }
    }
    signature
}

/// Fraction of matching signature slots: the Jaccard estimate.
pub fn similarity(a: &[u64], b: &[u64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
    matches as f64 / a.len() as f64
}

// ---------------------------------------------------------------------------
// Union-find
// ---------------------------------------------------------------------------

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins so cluster roots are stable.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

// ---------------------------------------------------------------------------
// Canonicality
// ---------------------------------------------------------------------------

const DEMOTED_SEGMENTS: &[&str] = &["archive", "archived", "old", "deprecated", "backup", "scratch", "tmp"];

/// Path heuristic for how likely a document is the canonical home of its
/// content, in `[0, 1]`.
pub fn canonicality(rel: &str) -> f64 {
    let lower = rel.to_lowercase();
    let mut score: f64 = 0.5;

    let segments: Vec<&str> = lower.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    let file = paths::file_name(&lower);
    let stem = file.split('.').next().unwrap_or(file);

    if dirs.contains(&"docs") {
        score += 0.2;
    }
    if matches!(stem, "readme" | "index") {
        score += 0.2;
    }
    if stem.contains("guide") || stem.contains("reference") || stem.contains("overview") {
        score += 0.1;
    }
    if dirs.iter().any(|d| DEMOTED_SEGMENTS.contains(d))
        || DEMOTED_SEGMENTS.iter().any(|s| stem.ends_with(&format!("-{s}")) || stem.ends_with(&format!("_{s}")))
    {
        score -= 0.4;
    }
    score.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

struct Candidate<'a> {
    doc: &'a Document,
    paragraph: &'a Paragraph,
    signature: Vec<u64>,
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

pub fn detect(
    index: &DocumentIndex,
    config: &DuplicateConfig,
    revisions: &dyn RevisionSource,
    focus: &BTreeSet<String>,
) -> Result<DuplicateReport> {
    if config.bands == 0
        || config.num_hashes == 0
        || config.num_hashes % config.bands != 0
        || config.shingle_size == 0
    {
        return Err(DocsweepError::InvalidConfig(format!(
            "duplicates: num_hashes ({}) must be a non-zero multiple of bands ({}) and shingle_size non-zero",
            config.num_hashes, config.bands
        )));
    }
    let rows = config.rows_per_band();
    let min_words = config.min_words;

    let candidates: Vec<Candidate> = index
        .iter()
        .flat_map(|doc| {
            doc.paragraphs
                .iter()
                .filter(move |p| p.word_count >= min_words)
                .map(move |p| (doc, p))
        })
        .map(|(doc, paragraph)| Candidate {
            doc,
            paragraph,
            signature: minhash(&shingles(&paragraph.text, config.shingle_size), config.num_hashes),
        })
        .collect();

    // Bucket by band hash and by exact fingerprint.
    let mut buckets: HashMap<(usize, u64), Vec<usize>> = HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        for (band, chunk) in c.signature.chunks(rows).enumerate() {
            let bytes: Vec<u8> = chunk.iter().flat_map(|v| v.to_le_bytes()).collect();
            buckets.entry((band, xxh3_64(&bytes))).or_default().push(i);
        }
        buckets
            .entry((usize::MAX, c.paragraph.fingerprint))
            .or_default()
            .push(i);
    }

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for members in buckets.values().filter(|m| m.len() > 1) {
        for (x, &a) in members.iter().enumerate() {
            for &b in &members[x + 1..] {
                if candidates[a].doc.path != candidates[b].doc.path {
                    pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
    }

    let pair_similarity = |a: usize, b: usize| -> f64 {
        if candidates[a].paragraph.fingerprint == candidates[b].paragraph.fingerprint {
            1.0
        } else {
            similarity(&candidates[a].signature, &candidates[b].signature)
        }
    };

    let mut sets = DisjointSet::new(candidates.len());
    let mut edges = 0usize;
    for &(a, b) in &pairs {
        if pair_similarity(a, b) >= config.threshold {
            sets.union(a, b);
            edges += 1;
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(a, b) in &pairs {
        for i in [a, b] {
            let root = sets.find(i);
            groups.entry(root).or_default().push(i);
        }
    }

    let mut clusters = Vec::new();
    for mut members in groups.into_values() {
        members.sort_unstable();
        members.dedup();
        if members.len() < 2 {
            continue;
        }
        let files: BTreeSet<&str> = members.iter().map(|&i| candidates[i].doc.path.as_str()).collect();
        if files.len() < 2 {
            continue;
        }
        if !files.iter().any(|f| focus.contains(*f)) {
            continue;
        }
        clusters.push(build_cluster(&candidates, &members, revisions, &pair_similarity));
    }

    clusters.sort_by(|a, b| {
        b.passages
            .len()
            .cmp(&a.passages.len())
            .then_with(|| a.authoritative.cmp(&b.authoritative))
            .then_with(|| a.authoritative_line.cmp(&b.authoritative_line))
    });

    tracing::debug!(
        paragraphs = candidates.len(),
        pairs = pairs.len(),
        edges,
        clusters = clusters.len(),
        "duplicate detection"
    );
    Ok(DuplicateReport {
        paragraphs_considered: candidates.len(),
        clusters,
    })
}

fn build_cluster(
    candidates: &[Candidate],
    members: &[usize],
    revisions: &dyn RevisionSource,
    pair_similarity: &dyn Fn(usize, usize) -> f64,
) -> DuplicateCluster {
    let mut sims = Vec::new();
    for (x, &a) in members.iter().enumerate() {
        for &b in &members[x + 1..] {
            sims.push(pair_similarity(a, b));
        }
    }
    let min_similarity = sims.iter().copied().fold(1.0_f64, f64::min);
    let mean_similarity = sims.iter().sum::<f64>() / sims.len().max(1) as f64;

    // Recency rank over the distinct documents in the cluster.
    let mut times: Vec<Option<chrono::DateTime<chrono::Utc>>> = members
        .iter()
        .map(|&i| revisions.last_modified(&candidates[i].doc.path))
        .collect();
    times.sort();
    times.dedup();
    let recency = |path: &str| -> f64 {
        if times.len() < 2 {
            return 1.0;
        }
        let t = revisions.last_modified(path);
        let rank = times.iter().position(|x| *x == t).unwrap_or(0);
        rank as f64 / (times.len() - 1) as f64
    };

    let max_words = members
        .iter()
        .map(|&i| candidates[i].doc.word_count)
        .max()
        .unwrap_or(0)
        .max(1);

    let mut passages: Vec<Passage> = members
        .iter()
        .map(|&i| {
            let c = &candidates[i];
            let completeness = c.doc.word_count as f64 / max_words as f64;
            let score = 0.5 * completeness + 0.3 * recency(&c.doc.path) + 0.2 * canonicality(&c.doc.path);
            Passage {
                path: c.doc.path.clone(),
                line: c.paragraph.line,
                word_count: c.paragraph.word_count,
                excerpt: excerpt(&c.paragraph.text),
                score: (score * 1000.0).round() / 1000.0,
            }
        })
        .collect();
    passages.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));

    // Highest score wins; passages are path-ordered, so the first maximum is
    // the lexically smallest path.
    let best = passages
        .iter()
        .fold(None::<&Passage>, |best, p| match best {
            Some(b) if b.score >= p.score => Some(b),
            _ => Some(p),
        });
    let (authoritative, authoritative_line) = best
        .map(|p| (p.path.clone(), p.line))
        .unwrap_or_default();

    DuplicateCluster {
        passages,
        authoritative,
        authoritative_line,
        min_similarity: (min_similarity * 1000.0).round() / 1000.0,
        mean_similarity: (mean_similarity * 1000.0).round() / 1000.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::path::Path;

    const INSTALL: &str = "To install the tool run the installer script from the repository \
                           root and then add the binary directory to your shell path before \
                           running any other command.";

    fn index_of(files: &[(&str, &str)]) -> DocumentIndex {
        DocumentIndex::from_documents(
            Path::new("/repo"),
            files.iter().map(|(p, c)| Document::parse(p, c)),
        )
    }

    fn all(index: &DocumentIndex) -> BTreeSet<String> {
        index.paths().map(str::to_string).collect()
    }

    fn times(entries: &[(&str, &str)]) -> BTreeMap<String, DateTime<Utc>> {
        entries
            .iter()
            .map(|(p, t)| (p.to_string(), DateTime::parse_from_rfc3339(t).unwrap().with_timezone(&Utc)))
            .collect()
    }

    #[test]
    fn shingles_of_short_text_is_whole_text() {
        let s = shingles("One two three", 5);
        assert_eq!(s.len(), 1);
        assert!(s.contains("one two three"));
        assert_eq!(shingles("a b c d e f", 5).len(), 2);
    }

    #[test]
    fn similar_texts_have_similar_signatures() {
        let a = minhash(&shingles(INSTALL, 3), 128);
        let b = minhash(&shingles(&INSTALL.replace("before", "prior to"), 3), 128);
        let c = minhash(&shingles("Completely unrelated words about cooking pasta at home tonight", 3), 128);
        assert!(similarity(&a, &a) == 1.0);
        assert!(similarity(&a, &b) > similarity(&a, &c));
        assert!(similarity(&a, &c) < 0.2);
    }

    #[test]
    fn canonicality_prefers_docs_and_demotes_archive() {
        assert!(canonicality("docs/install.md") > canonicality("notes/install.md"));
        assert!(canonicality("docs/README.md") > canonicality("docs/install.md"));
        assert!(canonicality("archive/install.md") < canonicality("notes/install.md"));
        assert!(canonicality("docs/old/install.md") < canonicality("docs/install.md"));
        assert!(canonicality("golden/install.md") == canonicality("notes/install.md"));
    }

    #[test]
    fn clusters_identical_paragraphs_across_files() {
        let long = format!("# Install\n\n{INSTALL}\n\nMore detail follows here.\n");
        let index = index_of(&[
            ("docs/install.md", long.as_str()),
            ("notes/setup.md", INSTALL),
            ("archive/old.md", INSTALL),
            ("other.md", "Unrelated short text.\n"),
        ]);
        let revs = times(&[
            ("docs/install.md", "2024-05-01T00:00:00Z"),
            ("notes/setup.md", "2024-01-01T00:00:00Z"),
            ("archive/old.md", "2023-01-01T00:00:00Z"),
        ]);
        let report = detect(&index, &DuplicateConfig::default(), &revs, &all(&index)).unwrap();
        assert_eq!(report.clusters.len(), 1);
        let cluster = &report.clusters[0];
        assert_eq!(cluster.files().len(), 3);
        assert_eq!(cluster.authoritative, "docs/install.md");
        assert_eq!(cluster.min_similarity, 1.0);
        assert_eq!(cluster.redundant().count(), 2);
    }

    #[test]
    fn same_file_repeats_are_not_clusters() {
        let twice = format!("{INSTALL}\n\n{INSTALL}\n");
        let index = index_of(&[("a.md", twice.as_str())]);
        let revs: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let report = detect(&index, &DuplicateConfig::default(), &revs, &all(&index)).unwrap();
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn short_paragraphs_ignored() {
        let index = index_of(&[("a.md", "Run cargo build.\n"), ("b.md", "Run cargo build.\n")]);
        let revs: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let report = detect(&index, &DuplicateConfig::default(), &revs, &all(&index)).unwrap();
        assert_eq!(report.paragraphs_considered, 0);
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn focus_limits_reported_clusters() {
        let index = index_of(&[("a.md", INSTALL), ("b.md", INSTALL), ("c.md", "Something else entirely.")]);
        let revs: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let focus: BTreeSet<String> = ["c.md".to_string()].into_iter().collect();
        let report = detect(&index, &DuplicateConfig::default(), &revs, &focus).unwrap();
        assert!(report.clusters.is_empty());
        let focus: BTreeSet<String> = ["b.md".to_string()].into_iter().collect();
        let report = detect(&index, &DuplicateConfig::default(), &revs, &focus).unwrap();
        assert_eq!(report.clusters.len(), 1);
    }

    #[test]
    fn tie_breaks_on_smallest_path() {
        let index = index_of(&[("b.md", INSTALL), ("a.md", INSTALL)]);
        let revs: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let report = detect(&index, &DuplicateConfig::default(), &revs, &all(&index)).unwrap();
        assert_eq!(report.clusters[0].authoritative, "a.md");
    }

    #[test]
    fn invalid_banding_rejected() {
        let index = index_of(&[]);
        let revs: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let cfg = DuplicateConfig {
            bands: 7,
            ..DuplicateConfig::default()
        };
        assert!(detect(&index, &cfg, &revs, &BTreeSet::new()).is_err());
    }
}
