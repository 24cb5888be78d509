use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nadir_core::blend::estimate_order;
use nadir_core::io::load_project;
use nadir_core::remap::PanoramaSource;

#[derive(Args)]
pub struct OrderArgs {
    /// Project file (TOML)
    pub project: PathBuf,
}

pub fn run(args: &OrderArgs) -> Result<()> {
    let layers = load_project(&args.project)
        .with_context(|| format!("Failed to load project {}", args.project.display()))?;
    let order = estimate_order(&layers, layers.options(), &layers.image_ids())
        .context("Blend order estimation failed")?;

    let joined: Vec<String> = order.iter().map(|id| id.to_string()).collect();
    println!("{}", joined.join(" "));
    Ok(())
}
