use crate::error::{DocsweepError, Result};
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".docsweep.yaml";
pub const GIT_DIR: &str = ".git";

/// Root-relative path used for links that point at the repository root itself.
pub const ROOT_REL: &str = ".";

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

const EXTERNAL_SCHEMES: &[&str] = &[
    "http:",
    "https:",
    "mailto:",
    "ftp:",
    "tel:",
    "data:",
    "javascript:",
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Root-relative path with forward slashes and no leading `./`.
pub fn normalize_rel(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ROOT_REL.to_string()
    } else {
        parts.join("/")
    }
}

/// Absolute filesystem path for a root-relative path.
pub fn absolute(root: &Path, rel: &str) -> PathBuf {
    if rel == ROOT_REL {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

pub fn is_markdown(rel: &str) -> bool {
    Path::new(rel)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            MARKDOWN_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

pub fn file_name(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

/// Directory part of a root-relative path, `""` for top-level files.
pub fn parent_dir(rel: &str) -> &str {
    match rel.rfind('/') {
        Some(idx) => &rel[..idx],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// Link targets
// ---------------------------------------------------------------------------

pub fn is_external(target: &str) -> bool {
    let lower = target.trim().to_ascii_lowercase();
    lower.starts_with("//") || EXTERNAL_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// Split `path#anchor` into its parts. A missing or empty fragment yields `None`.
pub fn split_anchor(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, anchor)) if !anchor.is_empty() => (path, Some(anchor)),
        Some((path, _)) => (path, None),
        None => (target, None),
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim.
pub fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolve a link `target` found in `source_rel` to a root-relative path.
///
/// Targets starting with `/` are root-relative; everything else is relative
/// to the directory containing the source document.
pub fn resolve_link_path(source_rel: &str, target: &str) -> Result<String> {
    let mut parts: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        parent_dir(source_rel)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(DocsweepError::OutsideRoot(target.to_string()));
                }
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        Ok(ROOT_REL.to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Shortest relative link from the document `from_rel` to `to_rel`.
pub fn relative_link(from_rel: &str, to_rel: &str) -> String {
    let from_dir: Vec<&str> = parent_dir(from_rel)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = to_rel.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = Vec::new();
    for _ in common..from_dir.len() {
        out.push("..");
    }
    out.extend(&to[common..]);
    out.join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
