use super::{Context, ScopeArgs};
use crate::output::{plural, print_json};
use anyhow::Context as _;
use docsweep_core::{io, plan::Plan};
use std::path::Path;

pub fn run(ctx: &Context, scope: &ScopeArgs, output: Option<&Path>) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let analysis = ctx.prepare(&config, scope)?;
    let report = analysis.report().context("failed to analyze documentation")?;
    let plan = Plan::from_report(&report);

    if let Some(path) = output {
        io::atomic_write(path, plan.to_markdown().as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        if ctx.json {
            print_json(&serde_json::json!({
                "path": path.display().to_string(),
                "actions": plan.actions.len(),
            }))?;
        } else {
            println!("wrote {} to {}", plural(plan.actions.len(), "action"), path.display());
        }
        return Ok(());
    }

    if ctx.json {
        print_json(&plan)
    } else {
        print!("{}", plan.to_markdown());
        Ok(())
    }
}
