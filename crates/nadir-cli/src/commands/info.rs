use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nadir_core::io::load_project;
use nadir_core::remap::PanoramaSource;

#[derive(Args)]
pub struct InfoArgs {
    /// Project file (TOML)
    pub project: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let layers = load_project(&args.project)
        .with_context(|| format!("Failed to load project {}", args.project.display()))?;
    let options = layers.options();

    println!("Project:     {}", args.project.display());
    println!("Canvas:      {}x{}", options.width, options.height);
    println!(
        "HFOV:        {:.1}\u{b0}{}",
        options.hfov,
        if options.wraparound() { " (wraps around)" } else { "" }
    );
    println!("Layers:      {}", layers.len());
    println!();

    for id in layers.image_ids() {
        let layer = layers.layer(id)?;
        let roi = layers.image_roi(id, options)?;
        let valid = layer.alpha.iter().filter(|&&a| a > 0).count();
        println!(
            "  #{id:<4} {}x{} at ({}, {})  {} {}ch  valid {:.1}%  roi {}{}",
            layer.image.width(),
            layer.image.height(),
            layer.x,
            layer.y,
            layer.image.depth,
            layer.image.channels(),
            100.0 * valid as f64 / layer.alpha.len().max(1) as f64,
            roi,
            if layer.icc_profile.is_empty() { "" } else { "  icc" }
        );
    }

    Ok(())
}
