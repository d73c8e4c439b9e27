use super::{Context, ScopeArgs};
use crate::output::{plural, print_json, print_table};
use anyhow::Context as _;
use docsweep_core::report::Severity;
use std::collections::BTreeMap;

pub fn run(ctx: &Context, scope: &ScopeArgs, fail_on: &str) -> anyhow::Result<()> {
    let threshold: Severity = fail_on.parse().context("invalid --fail-on")?;
    let config = ctx.load_config()?;
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.report().context("failed to analyze documentation")?;
    let findings = report.findings();
    let failing = findings
        .iter()
        .filter(|f| f.severity.at_least(threshold))
        .count();

    if ctx.json {
        print_json(&serde_json::json!({
            "passed": failing == 0,
            "fail_on": threshold,
            "mode": report.mode,
            "documents": report.documents,
            "findings": findings,
        }))?;
    } else {
        if !findings.is_empty() {
            let rows = findings
                .iter()
                .map(|f| {
                    vec![
                        f.severity.to_string(),
                        f.kind.to_string(),
                        f.location(),
                        f.message.clone(),
                    ]
                })
                .collect();
            print_table(&["SEVERITY", "KIND", "LOCATION", "MESSAGE"], rows);
            println!();
        }

        let mut counts: BTreeMap<u8, (Severity, usize)> = BTreeMap::new();
        for f in &findings {
            counts.entry(f.severity.rank()).or_insert((f.severity, 0)).1 += 1;
        }
        let breakdown: Vec<String> = counts
            .values()
            .rev()
            .map(|(sev, n)| format!("{n} {sev}"))
            .collect();
        println!(
            "{} in {} ({}){}",
            plural(findings.len(), "finding"),
            plural(report.documents, "document"),
            report.mode,
            if breakdown.is_empty() {
                String::new()
            } else {
                format!(": {}", breakdown.join(", "))
            }
        );
    }

    if failing > 0 {
        anyhow::bail!(
            "check failed: {} at or above {threshold}",
            plural(failing, "finding")
        );
    }
    if !ctx.json {
        println!("check passed (fail-on {threshold})");
    }
    Ok(())
}
