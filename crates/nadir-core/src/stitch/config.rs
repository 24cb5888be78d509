use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::blend::{BlendFunctor, DifferenceBlender, SeamBlender, SeamParams, StackingBlender};
use crate::raster::PixelDepth;
use crate::reduce::{DifferenceReducer, HdrMergeReducer, PixelReducer};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StitchConfig {
    #[serde(default)]
    pub blend: BlendMode,
    /// When set, every image is held in memory and reduced per pixel;
    /// `blend` and `order` are ignored.
    #[serde(default)]
    pub reduce: Option<ReduceMode>,
    /// Fold order; unset resolves per blend mode, see [`StitchOrder::for_blend`].
    #[serde(default)]
    pub order: Option<StitchOrder>,
    #[serde(default)]
    pub seam: SeamParams,
    #[serde(default)]
    pub output: OutputConfig,
}

impl StitchConfig {
    /// The explicit order policy, or the default for the blend mode.
    pub fn effective_order(&self) -> StitchOrder {
        self.order.unwrap_or_else(|| StitchOrder::for_blend(self.blend))
    }
}

/// Incremental compositing rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    Stacking,
    #[default]
    Seam,
    Difference,
}

impl BlendMode {
    pub fn functor(&self, seam: &SeamParams) -> Box<dyn BlendFunctor> {
        match self {
            Self::Stacking => Box::new(StackingBlender),
            Self::Seam => Box::new(SeamBlender::new(seam.clone())),
            Self::Difference => Box::new(DifferenceBlender),
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stacking => write!(f, "Stacking"),
            Self::Seam => write!(f, "Seam (multiband)"),
            Self::Difference => write!(f, "Difference"),
        }
    }
}

/// Whole-stack per-pixel reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceMode {
    /// Sum of absolute deviations from the mean.
    Deviation,
    /// Exposure-weighted HDR merge.
    HdrMerge,
}

impl ReduceMode {
    pub fn reducer(&self) -> Box<dyn PixelReducer> {
        match self {
            Self::Deviation => Box::new(DifferenceReducer),
            Self::HdrMerge => Box::new(HdrMergeReducer),
        }
    }
}

impl std::fmt::Display for ReduceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deviation => write!(f, "Deviation"),
            Self::HdrMerge => write!(f, "HDR merge"),
        }
    }
}

/// Order in which images are folded into the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StitchOrder {
    /// Image order as supplied; the last image ends on top.
    AsGiven,
    /// Reverse order; the first image ends on top.
    Reversed,
    /// Maximize successive overlap (weighted stitching).
    Estimated,
}

impl StitchOrder {
    /// Simple stitching keeps the supplied order; seam blending estimates one.
    pub fn for_blend(blend: BlendMode) -> Self {
        match blend {
            BlendMode::Seam => Self::Estimated,
            BlendMode::Stacking | BlendMode::Difference => Self::AsGiven,
        }
    }
}

impl std::fmt::Display for StitchOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AsGiven => write!(f, "As given"),
            Self::Reversed => write!(f, "Reversed"),
            Self::Estimated => write!(f, "Estimated"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Output sample depth; the panorama's or the sources' depth when unset.
    pub depth: Option<PixelDepth>,
    pub compression: Option<String>,
    /// Write every remapped image as its own canvas-sized layer instead.
    pub layers: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("panorama.tif"),
            depth: None,
            compression: None,
            layers: false,
        }
    }
}
