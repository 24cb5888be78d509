use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raster::{Canvas, PixelDepth};
use crate::remap::ImageId;

/// Stitcher state, reported as progress.
///
/// Every strategy runs `ComputingRois`, `RemappingImages`, `Compositing`,
/// `Finalizing` and `Done` in that order. Blend strategies remap only the
/// blend-order masks in `RemappingImages`, then pass through
/// `EstimatingBlendOrder` when the order is estimated, and remap each full
/// image inside `Compositing` right before folding it. The reduce strategy
/// remaps every full image in `RemappingImages`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StitchPhase {
    #[default]
    Idle,
    ComputingRois,
    RemappingImages,
    EstimatingBlendOrder,
    Compositing,
    Finalizing,
    Done,
}

impl std::fmt::Display for StitchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::ComputingRois => write!(f, "Computing ROIs"),
            Self::RemappingImages => write!(f, "Remapping images"),
            Self::EstimatingBlendOrder => write!(f, "Estimating blend order"),
            Self::Compositing => write!(f, "Compositing"),
            Self::Finalizing => write!(f, "Finalizing"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Thread-safe progress reporting for a stitch.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new phase has started. `total_items` is the number of images the
    /// phase will process, if known.
    fn begin_phase(&self, _phase: StitchPhase, _total_items: Option<usize>) {}

    /// One image within the current phase has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current phase is finished.
    fn finish_phase(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Finished canvas with what the writer needs to persist it.
#[derive(Clone, Debug)]
pub struct StitchOutput {
    pub canvas: Canvas,
    /// ICC profile of the first image that had one.
    pub icc_profile: Vec<u8>,
    pub depth: PixelDepth,
    pub compression: Option<String>,
}

/// What happened to each image during a stitch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchReport {
    /// Order in which images were composited.
    pub order: Vec<ImageId>,
    /// Images that contributed to the canvas.
    pub composited: Vec<ImageId>,
    /// Images skipped because they do not touch the canvas.
    pub skipped: Vec<ImageId>,
}

/// External image writer the finished canvas is handed to.
pub trait CanvasWriter {
    fn write(&mut self, output: &StitchOutput) -> Result<()>;

    /// Write one image's layer when layers are exported separately.
    fn write_layer(&mut self, image: ImageId, output: &StitchOutput) -> Result<()>;
}
