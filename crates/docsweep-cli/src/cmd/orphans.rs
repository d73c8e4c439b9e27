use super::{Context, ScopeArgs};
use crate::output::{plural, print_json, print_table};
use anyhow::Context as _;
use docsweep_core::orphans::OrphanBasis;

pub fn run(ctx: &Context, scope: &ScopeArgs) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.orphans().context("failed to analyze orphans")?;

    if ctx.json {
        return print_json(&report);
    }

    match report.basis {
        OrphanBasis::Reachability => println!(
            "roots: {} ({} reachable)",
            report.roots.join(", "),
            plural(report.reachable, "document")
        ),
        OrphanBasis::NoInboundLinks => {
            println!("no root document found; listing documents nothing links to")
        }
    }
    println!();

    if !report.candidates.is_empty() {
        let rows = report
            .candidates
            .iter()
            .map(|c| vec![c.path.clone(), c.inbound.to_string(), c.word_count.to_string()])
            .collect();
        print_table(&["DOCUMENT", "INBOUND", "WORDS"], rows);
        println!();
    }
    if !report.protected.is_empty() {
        println!("protected (kept): {}", report.protected.join(", "));
    }
    println!("{}", plural(report.candidates.len(), "orphan candidate"));
    Ok(())
}
