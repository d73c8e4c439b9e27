use super::{Context, ScopeArgs};
use crate::output::{plural, print_json};
use anyhow::Context as _;

pub fn run(ctx: &Context, scope: &ScopeArgs, threshold: Option<f64>) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(t) = threshold {
        if !(t > 0.0 && t <= 1.0) {
            anyhow::bail!("--threshold must be in (0, 1], got {t}");
        }
        config.duplicates.threshold = t;
    }
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.duplicates().context("failed to detect duplicates")?;

    if ctx.json {
        return print_json(&report);
    }

    for (i, cluster) in report.clusters.iter().enumerate() {
        println!(
            "cluster {} ({}, similarity min {:.2} / mean {:.2})",
            i + 1,
            plural(cluster.passages.len(), "passage"),
            cluster.min_similarity,
            cluster.mean_similarity
        );
        for p in &cluster.passages {
            let marker = if p.path == cluster.authoritative && p.line == cluster.authoritative_line {
                "*"
            } else {
                " "
            };
            println!("  {marker} {}:{}  [{:.2}]  {}", p.path, p.line, p.score, p.excerpt);
        }
        println!();
    }
    println!(
        "{} from {} considered (* = suggested authoritative source)",
        plural(report.clusters.len(), "cluster"),
        plural(report.paragraphs_considered, "paragraph"),
    );
    Ok(())
}
