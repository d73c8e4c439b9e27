use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use docsweep_core::{config::Config, io, paths};

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let path = ctx
        .config_path
        .clone()
        .unwrap_or_else(|| paths::config_path(&ctx.root));

    let yaml = serde_yaml::to_string(&Config::default()).context("failed to render default config")?;
    let created = io::write_if_missing(&path, yaml.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if ctx.json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "created": created,
        }))?;
    } else if created {
        println!("created: {}", path.display());
    } else {
        println!("exists:  {}", path.display());
    }
    Ok(())
}
