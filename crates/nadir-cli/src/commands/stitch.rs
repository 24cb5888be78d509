use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use nadir_core::io::{load_project, FileWriter};
use nadir_core::raster::PixelDepth;
use nadir_core::remap::PanoramaSource;
use nadir_core::stitch::{
    stitch_to_writer, BlendMode, ReduceMode, StitchConfig, StitchOrder, StitchReport,
};
use serde::Serialize;

use crate::progress::BarReporter;
use crate::summary::{print_report, print_stitch_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum BlendArg {
    Stacking,
    Seam,
    Difference,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OrderArg {
    AsGiven,
    Reversed,
    Estimated,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReduceArg {
    Deviation,
    Hdr,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DepthArg {
    U8,
    U16,
    F32,
}

#[derive(Args)]
pub struct StitchArgs {
    /// Project file (TOML)
    pub project: PathBuf,

    /// Stitch config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Blend mode
    #[arg(long, value_enum)]
    pub blend: Option<BlendArg>,

    /// Blend order
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Reduce all layers per pixel instead of blending
    #[arg(long, value_enum)]
    pub reduce: Option<ReduceArg>,

    /// Seam blender pyramid levels
    #[arg(long)]
    pub levels: Option<usize>,

    /// Output sample depth
    #[arg(long, value_enum)]
    pub depth: Option<DepthArg>,

    /// Write each layer to its own file
    #[arg(long)]
    pub layers: bool,

    /// Write a TOML record of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunRecord<'a> {
    project: &'a PathBuf,
    written: Vec<PathBuf>,
    config: &'a StitchConfig,
    report: &'a StitchReport,
}

pub fn run(args: &StitchArgs) -> Result<()> {
    let mut config: StitchConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid stitch config")?
    } else {
        StitchConfig::default()
    };
    apply_overrides(&mut config, args);

    let layers = load_project(&args.project)
        .with_context(|| format!("Failed to load project {}", args.project.display()))?;
    print_stitch_summary(&config, &args.project, layers.options(), layers.len());

    let reporter = Arc::new(BarReporter::new()?);
    let mut writer = FileWriter::new(&config.output.path);
    let report = stitch_to_writer(&layers, &layers, &config, &mut writer, reporter.clone())
        .context("Stitching failed")?;
    reporter.finish();

    print_report(&report);
    for path in writer.written() {
        println!("\nOutput saved to {}", path.display());
    }

    if let Some(ref path) = args.report {
        let record = RunRecord {
            project: &args.project,
            written: writer.written().to_vec(),
            config: &config,
            report: &report,
        };
        std::fs::write(path, toml::to_string_pretty(&record)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(())
}

fn apply_overrides(config: &mut StitchConfig, args: &StitchArgs) {
    if let Some(blend) = args.blend {
        config.blend = match blend {
            BlendArg::Stacking => BlendMode::Stacking,
            BlendArg::Seam => BlendMode::Seam,
            BlendArg::Difference => BlendMode::Difference,
        };
    }
    if let Some(order) = args.order {
        config.order = Some(match order {
            OrderArg::AsGiven => StitchOrder::AsGiven,
            OrderArg::Reversed => StitchOrder::Reversed,
            OrderArg::Estimated => StitchOrder::Estimated,
        });
    }
    if let Some(reduce) = args.reduce {
        config.reduce = Some(match reduce {
            ReduceArg::Deviation => ReduceMode::Deviation,
            ReduceArg::Hdr => ReduceMode::HdrMerge,
        });
    }
    if args.levels.is_some() {
        config.seam.levels = args.levels;
    }
    if let Some(depth) = args.depth {
        config.output.depth = Some(match depth {
            DepthArg::U8 => PixelDepth::U8,
            DepthArg::U16 => PixelDepth::U16,
            DepthArg::F32 => PixelDepth::F32,
        });
    }
    if args.layers {
        config.output.layers = true;
    }
    if let Some(ref output) = args.output {
        config.output.path = output.clone();
    }
}
