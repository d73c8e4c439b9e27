use super::{Context, ScopeArgs};
use crate::output::{plural, print_json};
use anyhow::Context as _;
use docsweep_core::prune::prune;

pub fn run(ctx: &Context, apply: bool) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    // Pruning always works from a full scan: reachability is global.
    let analysis = ctx.prepare(&config, &ScopeArgs::default())?;
    let orphans = analysis.orphans().context("failed to analyze orphans")?;
    let outcome = prune(&ctx.root, &config, &orphans, apply).context("failed to prune documents")?;

    if ctx.json {
        return print_json(&outcome);
    }

    if outcome.removed.is_empty() {
        println!("nothing to prune");
    } else {
        println!("{}", if outcome.dry_run { "would remove:" } else { "removed:" });
        for path in &outcome.removed {
            println!("  {path}");
        }
        for dir in &outcome.removed_dirs {
            println!("  {dir}/ (empty directory)");
        }
    }
    for s in &outcome.skipped {
        println!("skipped {} ({})", s.path, s.reason);
    }
    if outcome.dry_run && !outcome.removed.is_empty() {
        println!(
            "\ndry run: re-run with --apply to delete {}",
            plural(outcome.removed.len(), "file")
        );
    }
    Ok(())
}
