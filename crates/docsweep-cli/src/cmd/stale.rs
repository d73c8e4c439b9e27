use super::{Context, ScopeArgs};
use crate::output::{plural, print_json, print_table};
use anyhow::Context as _;

pub fn run(ctx: &Context, scope: &ScopeArgs, min_lag_days: Option<u32>) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(days) = min_lag_days {
        config.staleness.min_lag_days = days;
    }
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.staleness().context("failed to score staleness")?;

    if ctx.json {
        return print_json(&report);
    }

    if !report.stale.is_empty() {
        let rows = report
            .stale
            .iter()
            .map(|s| {
                vec![
                    s.path.clone(),
                    format!("{:.1}", s.lag_days),
                    s.newest_source.clone(),
                    s.changed_sources.len().to_string(),
                ]
            })
            .collect();
        print_table(&["DOCUMENT", "LAG DAYS", "NEWEST SOURCE", "CHANGED"], rows);
        println!();
    }
    println!(
        "{} stale of {} with referenced sources (times from {})",
        report.stale.len(),
        plural(report.with_sources, "document"),
        report.revision_source
    );
    Ok(())
}
