//! Markdown parsing for the document index.
//!
//! One file becomes a [`Document`]: its heading tree, outbound links resolved
//! to root-relative paths, per-paragraph fingerprints for duplicate detection,
//! and path-like mentions used to correlate the document with source files.

use crate::paths;
use comrak::{
    nodes::{AstNode, NodeValue},
    parse_document, Arena, Options,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use xxhash_rust::xxh3::xxh3_64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub anchor: String,
    pub line: usize,
    /// Index of the enclosing heading in `Document::headings`.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    External { url: String },
    /// Fragment-only link into the same document.
    Anchor { anchor: String },
    Local {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
    },
    OutsideRoot { raw: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub raw: String,
    pub text: String,
    pub line: usize,
    pub target: LinkTarget,
    #[serde(default)]
    pub is_image: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub line: usize,
    pub text: String,
    pub word_count: usize,
    /// xxh3 of the case- and whitespace-normalized text.
    pub fingerprint: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub token: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub title: Option<String>,
    pub headings: Vec<Heading>,
    /// `id`/`name` attributes from inline HTML, valid anchor targets too.
    pub html_anchors: Vec<String>,
    pub links: Vec<Link>,
    pub paragraphs: Vec<Paragraph>,
    pub mentions: Vec<Mention>,
    pub word_count: usize,
    pub content_hash: u64,
}

// ---------------------------------------------------------------------------
// Regexes
// ---------------------------------------------------------------------------

static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();
static MENTION_RE: OnceLock<Regex> = OnceLock::new();
static HTML_ANCHOR_RE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_re() -> &'static Regex {
    FRONTMATTER_RE.get_or_init(|| {
        Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n(?:---|\.\.\.)[ \t]*(?:\r?\n|\z)").unwrap()
    })
}

fn mention_re() -> &'static Regex {
    MENTION_RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9_.\-]+(?:/[A-Za-z0-9_.\-]+)*/[A-Za-z0-9_\-]+\.[A-Za-z][A-Za-z0-9]{0,7}\b")
            .unwrap()
    })
}

fn html_anchor_re() -> &'static Regex {
    HTML_ANCHOR_RE.get_or_init(|| Regex::new(r#"(?i)\b(?:id|name)\s*=\s*["']([^"']+)["']"#).unwrap())
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Lowercased alphanumeric word tokens.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

pub fn fingerprint(text: &str) -> u64 {
    xxh3_64(tokens(text).join(" ").as_bytes())
}

/// GitHub-style heading slug: lowercase, punctuation dropped, spaces to `-`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            out.extend(ch.to_lowercase());
        } else if ch == ' ' {
            out.push('-');
        }
    }
    out
}

/// Split YAML frontmatter off `content`. Returns the parsed value, the body
/// and the number of lines the frontmatter occupied.
///
/// A leading `---` block only counts as frontmatter when it is blank or a
/// YAML mapping. Anything else is a thematic break and stays in the body.
fn split_frontmatter(content: &str) -> (Option<serde_yaml::Value>, &str, usize) {
    let Some(caps) = frontmatter_re().captures(content) else {
        return (None, content, 0);
    };
    let Some(whole) = caps.get(0) else {
        return (None, content, 0);
    };
    let block = caps.get(1).map_or("", |m| m.as_str());
    let parsed = if block.trim().is_empty() {
        None
    } else {
        match serde_yaml::from_str::<serde_yaml::Value>(block) {
            Ok(value @ serde_yaml::Value::Mapping(_)) => Some(value),
            _ => return (None, content, 0),
        }
    };
    let consumed = &content[..whole.end()];
    let mut offset = consumed.matches('\n').count();
    if !consumed.ends_with('\n') {
        offset += 1;
    }
    (parsed, &content[whole.end()..], offset)
}

/// Suffix repeated slugs with `-1`, `-2`, ... skipping any suffix an earlier
/// heading already produced, so "Setup", "Setup", "Setup 1" yield
/// `setup`, `setup-1`, `setup-1-1`.
fn unique_slug(base: String, seen: &mut HashMap<String, usize>) -> String {
    let mut slug = base.clone();
    while seen.contains_key(&slug) {
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        slug = format!("{base}-{count}");
    }
    seen.insert(slug.clone(), 0);
    slug
}

// ---------------------------------------------------------------------------
// AST helpers
// ---------------------------------------------------------------------------

fn node_line(node: &AstNode<'_>) -> usize {
    node.data.borrow().sourcepos.start.line.max(1)
}

fn push_text_from_node<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(value) => out.push_str(value),
        NodeValue::Code(value) => out.push_str(&value.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
        _ => {
            for child in node.children() {
                push_text_from_node(child, out);
            }
        }
    }
}

fn inner_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for child in node.children() {
        push_text_from_node(child, &mut out);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn classify_target(source_rel: &str, raw: &str) -> Option<LinkTarget> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if paths::is_external(trimmed) {
        return Some(LinkTarget::External {
            url: trimmed.to_string(),
        });
    }

    let (path_part, anchor) = paths::split_anchor(trimmed);
    let path_part = path_part.split('?').next().unwrap_or_default();
    let anchor = anchor.map(paths::percent_decode);

    if path_part.is_empty() {
        return anchor.map(|anchor| LinkTarget::Anchor { anchor });
    }

    let decoded = paths::percent_decode(path_part);
    Some(match paths::resolve_link_path(source_rel, &decoded) {
        Ok(path) => LinkTarget::Local { path, anchor },
        Err(_) => LinkTarget::OutsideRoot {
            raw: trimmed.to_string(),
        },
    })
}

fn link_entry<'a>(
    rel: &str,
    node: &'a AstNode<'a>,
    url: &str,
    line: usize,
    is_image: bool,
) -> Option<Link> {
    let target = classify_target(rel, url)?;
    Some(Link {
        raw: url.trim().to_string(),
        text: inner_text(node),
        line,
        target,
        is_image,
    })
}

fn collect_mentions(text: &str, line: usize, out: &mut Vec<Mention>) {
    for m in mention_re().find_iter(text) {
        // Skip host/path fragments of bare URLs.
        if text[..m.start()].ends_with("//") || text[..m.start()].ends_with(':') {
            continue;
        }
        out.push(Mention {
            token: m.as_str().trim_start_matches("./").to_string(),
            line,
        });
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

impl Document {
    /// Parse `content` as the markdown file at root-relative path `rel`.
    pub fn parse(rel: &str, content: &str) -> Document {
        let (frontmatter, body, line_offset) = split_frontmatter(content);

        let arena = Arena::new();
        let options = Options::default();
        let root = parse_document(&arena, body, &options);

        let mut headings: Vec<Heading> = Vec::new();
        let mut html_anchors: Vec<String> = Vec::new();
        let mut links: Vec<Link> = Vec::new();
        let mut paragraphs: Vec<Paragraph> = Vec::new();
        let mut mentions: Vec<Mention> = Vec::new();
        let mut slug_counts: HashMap<String, usize> = HashMap::new();

        for node in root.descendants() {
            let line = node_line(node) + line_offset;
            let value = node.data.borrow().value.clone();
            match value {
                NodeValue::Heading(heading) => {
                    let text = inner_text(node);
                    let anchor = unique_slug(slugify(&text), &mut slug_counts);
                    let parent = headings.iter().rposition(|h| h.level < heading.level);
                    headings.push(Heading {
                        level: heading.level,
                        text,
                        anchor,
                        line,
                        parent,
                    });
                }
                NodeValue::Link(link) => links.extend(link_entry(rel, node, &link.url, line, false)),
                NodeValue::Image(link) => links.extend(link_entry(rel, node, &link.url, line, true)),
                NodeValue::Paragraph => {
                    let text = inner_text(node);
                    let word_count = tokens(&text).len();
                    if word_count > 0 {
                        paragraphs.push(Paragraph {
                            line,
                            fingerprint: fingerprint(&text),
                            word_count,
                            text,
                        });
                    }
                }
                NodeValue::Text(ref text) => collect_mentions(text, line, &mut mentions),
                NodeValue::Code(ref code) => collect_mentions(&code.literal, line, &mut mentions),
                NodeValue::HtmlInline(ref html) => {
                    html_anchors.extend(anchor_attrs(html));
                }
                NodeValue::HtmlBlock(ref block) => {
                    html_anchors.extend(anchor_attrs(&block.literal));
                }
                _ => {}
            }
        }

        let title = frontmatter
            .as_ref()
            .and_then(|fm| fm.get("title"))
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| {
                headings
                    .iter()
                    .find(|h| h.level == 1)
                    .map(|h| h.text.clone())
            });

        Document {
            path: rel.to_string(),
            title,
            headings,
            html_anchors,
            links,
            paragraphs,
            mentions,
            word_count: body.split_whitespace().count(),
            content_hash: xxh3_64(content.as_bytes()),
        }
    }

    pub fn has_anchor(&self, anchor: &str) -> bool {
        let wanted = anchor.to_lowercase();
        self.headings.iter().any(|h| h.anchor == wanted)
            || self.html_anchors.iter().any(|a| *a == anchor)
    }

    pub fn anchors(&self) -> impl Iterator<Item = &str> {
        self.headings
            .iter()
            .map(|h| h.anchor.as_str())
            .chain(self.html_anchors.iter().map(String::as_str))
    }

    /// Headings from the outermost section down to `idx`.
    pub fn heading_path(&self, idx: usize) -> Vec<&Heading> {
        let mut chain = Vec::new();
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            let Some(h) = self.headings.get(i) else { break };
            chain.push(h);
            cursor = h.parent;
        }
        chain.reverse();
        chain
    }
}

fn anchor_attrs(html: &str) -> Vec<String> {
    html_anchor_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
