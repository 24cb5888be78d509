use std::sync::Arc;

use tracing::info;

use crate::blend::{BlendFunctor, StackingBlender};
use crate::error::Result;
use crate::raster::Canvas;
use crate::remap::{PanoramaSource, Remapper};

use super::config::StitchConfig;
use super::orchestrator::{remap_image, Stitcher};
use super::types::{CanvasWriter, ProgressReporter, StitchOutput, StitchPhase, StitchReport};

/// Write every image as its own canvas-sized layer instead of compositing.
///
/// Each layer is remapped, stacked onto an empty canvas and handed to
/// `writer.write_layer`. Images that do not touch the canvas are skipped.
pub fn export_layers<P, R, W>(
    pano: &P,
    remapper: &R,
    config: &StitchConfig,
    writer: &mut W,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<StitchReport>
where
    P: PanoramaSource + ?Sized,
    R: Remapper + ?Sized,
    W: CanvasWriter + ?Sized,
{
    let stitcher = Stitcher::new(pano, remapper, config, reporter.clone());
    let images = pano.image_ids();
    let format = stitcher.validate(&images)?;
    let options = pano.options();
    let canvas_rect = options.canvas_rect();
    let depth = config
        .output
        .depth
        .or(options.output_depth)
        .unwrap_or(format.depth);
    let compression = config
        .output
        .compression
        .clone()
        .or_else(|| options.compression.clone());

    let mut report = StitchReport::default();
    reporter.begin_phase(StitchPhase::Compositing, Some(images.len()));
    for (i, &id) in images.iter().enumerate() {
        let roi = pano.image_roi(id, options)?.intersect(&canvas_rect);
        if roi.is_empty() {
            info!(image = id, "Layer does not touch the canvas, skipping");
            report.skipped.push(id);
            reporter.advance(i + 1);
            continue;
        }

        let image = remap_image(remapper, options, id, roi)?;
        let mut canvas = Canvas::new(options.width, options.height, format.channels, format.depth)?;
        StackingBlender.fold_image(&mut canvas, &image)?;
        if canvas.valid_count() == 0 {
            info!(image = id, "Layer has no valid pixels, skipping");
            report.skipped.push(id);
        } else {
            canvas.image.convert_depth(depth);
            let output = StitchOutput {
                canvas,
                icc_profile: image.icc_profile.clone(),
                depth,
                compression: compression.clone(),
            };
            writer.write_layer(id, &output)?;
            report.order.push(id);
            report.composited.push(id);
        }
        remapper.release(image);
        reporter.advance(i + 1);
    }
    reporter.finish_phase();

    info!(layers = report.composited.len(), "Layer export complete");
    Ok(report)
}
