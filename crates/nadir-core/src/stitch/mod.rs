pub mod config;
pub mod layers;
mod orchestrator;
pub mod reduce;
mod types;

pub use config::{BlendMode, OutputConfig, ReduceMode, StitchConfig, StitchOrder};
pub use layers::export_layers;
pub use orchestrator::{stitch_panorama, stitch_panorama_reported, stitch_to_writer, Stitcher};
pub use reduce::ReduceStitcher;
pub use types::{
    CanvasWriter, NoOpReporter, ProgressReporter, StitchOutput, StitchPhase, StitchReport,
};
