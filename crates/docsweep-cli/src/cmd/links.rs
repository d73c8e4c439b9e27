use super::{Context, ScopeArgs};
use crate::output::{plural, print_json, print_table};
use anyhow::Context as _;

pub fn run(ctx: &Context, scope: &ScopeArgs) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.links().context("failed to check links")?;

    if ctx.json {
        return print_json(&report);
    }

    if !report.broken.is_empty() {
        let rows = report
            .broken
            .iter()
            .map(|b| {
                vec![
                    format!("{}:{}", b.source, b.line),
                    b.kind.to_string(),
                    b.raw.clone(),
                    b.suggestion.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["LOCATION", "PROBLEM", "TARGET", "SUGGESTION"], rows);
        println!();
    }
    println!(
        "{} checked ({} external, not fetched), {} broken",
        plural(report.checked, "link"),
        report.external,
        report.broken.len()
    );
    Ok(())
}
