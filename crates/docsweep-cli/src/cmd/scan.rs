use super::{Context, ScopeArgs};
use crate::output::{plural, print_json};
use anyhow::Context as _;
use docsweep_core::corpus::{Corpus, ScanScope};
use docsweep_core::revision::revision_source;
use serde::Serialize;

#[derive(Serialize)]
struct ScanSummary<'a> {
    root: String,
    mode: &'a docsweep_core::corpus::ScanMode,
    revision_source: &'static str,
    documents: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    focus: Option<Vec<&'a str>>,
}

pub fn run(ctx: &Context, scope: &ScopeArgs) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let corpus = Corpus::discover(&ctx.root, &config.corpus)
        .with_context(|| format!("failed to discover documents under {}", ctx.root.display()))?;
    let scan = ScanScope::resolve(&ctx.root, scope.mode(), &corpus).context("failed to resolve scan scope")?;
    let revisions = revision_source(&ctx.root);
    let incremental = scan.mode.is_incremental();

    if ctx.json {
        return print_json(&ScanSummary {
            root: ctx.root.display().to_string(),
            mode: &scan.mode,
            revision_source: revisions.kind(),
            documents: &corpus.documents,
            changed: incremental.then(|| scan.changed.iter().map(String::as_str).collect()),
            focus: incremental.then(|| scan.focus.iter().map(String::as_str).collect()),
        });
    }

    println!("root:      {}", ctx.root.display());
    println!("mode:      {}", scan.mode);
    println!("history:   {}", revisions.kind());
    println!("corpus:    {}", plural(corpus.len(), "document"));
    if incremental {
        println!("changed:   {}", plural(scan.changed.len(), "file"));
        println!("focus:     {}", plural(scan.focus.len(), "document"));
        for path in &scan.focus {
            println!("  {path}");
        }
    }
    Ok(())
}
