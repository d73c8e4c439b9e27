use crate::corpus::Corpus;
use crate::document::{Document, LinkTarget};
use crate::error::Result;
use crate::paths;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Parsed view of every document in the corpus, keyed by root-relative path.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    root: PathBuf,
    docs: BTreeMap<String, Document>,
}

impl DocumentIndex {
    pub fn build(root: &Path, corpus: &Corpus) -> Result<DocumentIndex> {
        let mut docs = BTreeMap::new();
        for rel in &corpus.documents {
            let abs = paths::absolute(root, rel);
            let bytes = match std::fs::read(&abs) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(path = %rel, error = %e, "skipping unreadable document");
                    continue;
                }
            };
            let content = match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(_) => {
                    tracing::warn!(path = %rel, "skipping non-UTF-8 document");
                    continue;
                }
            };
            docs.insert(rel.clone(), Document::parse(rel, &content));
        }
        tracing::debug!(documents = docs.len(), "built document index");
        Ok(DocumentIndex {
            root: root.to_path_buf(),
            docs,
        })
    }

    /// Index over already-parsed documents. Used by tests and callers that
    /// parse content from somewhere other than the filesystem.
    pub fn from_documents(root: &Path, documents: impl IntoIterator<Item = Document>) -> Self {
        DocumentIndex {
            root: root.to_path_buf(),
            docs: documents
                .into_iter()
                .map(|d| (d.path.clone(), d))
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, rel: &str) -> Option<&Document> {
        self.docs.get(rel)
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.docs.contains_key(rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn anchors(&self, rel: &str) -> Vec<&str> {
        self.docs
            .get(rel)
            .map(|d| d.anchors().collect())
            .unwrap_or_default()
    }

    /// Indexed documents with the given file name.
    pub fn by_file_name(&self, name: &str) -> Vec<&str> {
        self.paths()
            .filter(|p| paths::file_name(p) == name)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Link graph
    // -----------------------------------------------------------------------

    /// Indexed documents `rel` links to, excluding itself.
    pub fn outbound_docs(&self, rel: &str) -> BTreeSet<&str> {
        let Some(doc) = self.docs.get(rel) else {
            return BTreeSet::new();
        };
        doc.links
            .iter()
            .filter_map(|l| match &l.target {
                LinkTarget::Local { path, .. } => self.resolve_doc(path),
                _ => None,
            })
            .filter(|p| *p != rel)
            .collect()
    }

    /// For every document, the number of *other* documents linking to it.
    pub fn inbound_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> = self.paths().map(|p| (p, 0)).collect();
        for rel in self.docs.keys() {
            for target in self.outbound_docs(rel) {
                if let Some(c) = counts.get_mut(target) {
                    *c += 1;
                }
            }
        }
        counts
    }

    /// Map a resolved link path to an indexed document. A link to a
    /// directory lands on its README or index page.
    fn resolve_doc(&self, path: &str) -> Option<&str> {
        if let Some((key, _)) = self.docs.get_key_value(path) {
            return Some(key.as_str());
        }
        let dir = if path == paths::ROOT_REL {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        ["README.md", "index.md", "readme.md"]
            .iter()
            .find_map(|name| self.docs.get_key_value(&format!("{dir}{name}")))
            .map(|(key, _)| key.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
