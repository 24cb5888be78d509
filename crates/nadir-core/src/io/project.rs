//! TOML project files describing pre-remapped layers.
//!
//! ```toml
//! width = 4000
//! height = 2000
//! hfov = 360.0
//!
//! [[layers]]
//! image = "layer_0000.tif"
//! mask = "mask_0000.png"
//! x = 120
//! y = 0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StitchError};
use crate::raster::PixelDepth;
use crate::remap::{LayerSet, PanoramaOptions};

use super::image_io::load_layer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectLayer {
    pub image: PathBuf,
    #[serde(default)]
    pub mask: Option<PathBuf>,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub width: usize,
    pub height: usize,
    #[serde(default = "default_hfov")]
    pub hfov: f64,
    #[serde(default)]
    pub output_depth: Option<PixelDepth>,
    #[serde(default)]
    pub compression: Option<String>,
    #[serde(default)]
    pub layers: Vec<ProjectLayer>,
}

fn default_hfov() -> f64 {
    PanoramaOptions::new(1, 1).hfov
}

impl Project {
    pub fn from_toml(text: &str) -> Result<Self> {
        let project: Project = toml::from_str(text)?;
        if project.width == 0 || project.height == 0 {
            return Err(StitchError::Project(format!(
                "canvas must not be empty ({}x{})",
                project.width, project.height
            )));
        }
        Ok(project)
    }

    pub fn options(&self) -> PanoramaOptions {
        PanoramaOptions {
            width: self.width,
            height: self.height,
            hfov: self.hfov,
            output_depth: self.output_depth,
            compression: self.compression.clone(),
        }
    }
}

/// Resolve `path` against the directory holding the project file.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Parse a project file and decode all of its layers.
pub fn load_project(path: &Path) -> Result<LayerSet> {
    let text = std::fs::read_to_string(path)?;
    let project = Project::from_toml(&text)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut set = LayerSet::new(project.options());
    for entry in &project.layers {
        let image = resolve(base, &entry.image);
        let mask = entry.mask.as_deref().map(|m| resolve(base, m));
        let layer = load_layer(&image, mask.as_deref(), entry.x, entry.y)?;
        set.push(layer)?;
    }
    info!(
        path = %path.display(),
        layers = set.len(),
        width = project.width,
        height = project.height,
        "Project loaded"
    );
    Ok(set)
}
