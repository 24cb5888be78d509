use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::blend::{order_from_masks, remap_order_masks};
use crate::consts::SUPPORTED_COMPRESSIONS;
use crate::error::{Result, StitchError};
use crate::geometry::Rect;
use crate::raster::{Canvas, PixelDepth};
use crate::remap::{
    AlphaLayer, ImageFormat, ImageId, PanoramaOptions, PanoramaSource, RemappedImage, Remapper,
};

use super::config::{StitchConfig, StitchOrder};
use super::reduce::ReduceStitcher;
use super::types::{
    CanvasWriter, NoOpReporter, ProgressReporter, StitchOutput, StitchPhase, StitchReport,
};

/// Drives one stitch from ROI computation to the finished canvas.
pub struct Stitcher<'a, P: PanoramaSource + ?Sized, R: Remapper + ?Sized> {
    pano: &'a P,
    remapper: &'a R,
    config: &'a StitchConfig,
    reporter: Arc<dyn ProgressReporter>,
    phase: StitchPhase,
}

impl<'a, P: PanoramaSource + ?Sized, R: Remapper + ?Sized> Stitcher<'a, P, R> {
    pub fn new(
        pano: &'a P,
        remapper: &'a R,
        config: &'a StitchConfig,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            pano,
            remapper,
            config,
            reporter,
            phase: StitchPhase::Idle,
        }
    }

    pub fn phase(&self) -> StitchPhase {
        self.phase
    }

    fn enter(&mut self, phase: StitchPhase, total: Option<usize>) {
        if self.phase != StitchPhase::Idle {
            self.reporter.finish_phase();
        }
        debug!(phase = %phase, "Entering stitch phase");
        self.phase = phase;
        if phase != StitchPhase::Done {
            self.reporter.begin_phase(phase, total);
        }
    }

    /// Check the image set and canvas before any remapping happens.
    pub fn validate(&self, images: &[ImageId]) -> Result<ImageFormat> {
        let options = self.pano.options();
        if options.width == 0 || options.height == 0 {
            return Err(StitchError::Configuration(format!(
                "empty canvas {}x{}",
                options.width, options.height
            )));
        }
        let Some((&first, rest)) = images.split_first() else {
            return Err(StitchError::EmptySequence);
        };

        let format = self.pano.image_format(first)?;
        for &id in rest {
            let other = self.pano.image_format(id)?;
            if other.depth != format.depth {
                return Err(StitchError::Configuration(format!(
                    "image {id} is {} but image {first} is {}",
                    other.depth, format.depth
                )));
            }
            if other.channels != format.channels {
                return Err(StitchError::Configuration(format!(
                    "image {id} has {} channels but image {first} has {}",
                    other.channels, format.channels
                )));
            }
        }

        if !matches!(format.channels, 1 | 3) {
            return Err(StitchError::Configuration(format!(
                "cannot write {}-channel output",
                format.channels
            )));
        }
        if let Some(compression) = self.compression() {
            if !SUPPORTED_COMPRESSIONS.contains(&compression.as_str()) {
                return Err(StitchError::Configuration(format!(
                    "unsupported compression '{compression}'"
                )));
            }
        }
        Ok(format)
    }

    fn output_depth(&self, source: PixelDepth) -> PixelDepth {
        self.config
            .output
            .depth
            .or(self.pano.options().output_depth)
            .unwrap_or(source)
    }

    fn compression(&self) -> Option<String> {
        self.config
            .output
            .compression
            .clone()
            .or_else(|| self.pano.options().compression.clone())
    }

    fn compute_rois(&mut self, images: &[ImageId]) -> Result<Vec<(ImageId, Rect)>> {
        self.enter(StitchPhase::ComputingRois, Some(images.len()));
        let options = self.pano.options();
        let canvas = options.canvas_rect();
        let mut rois = Vec::with_capacity(images.len());
        for (i, &id) in images.iter().enumerate() {
            let roi = self.pano.image_roi(id, options)?.intersect(&canvas);
            debug!(image = id, roi = %roi, "Image ROI");
            rois.push((id, roi));
            self.reporter.advance(i + 1);
        }
        Ok(rois)
    }

    /// Remap what must exist before compositing starts. Blend strategies
    /// only need the low-resolution masks of an estimated order here; full
    /// images are remapped one at a time while compositing.
    fn remap_blend_inputs(
        &mut self,
        policy: StitchOrder,
        images: &[ImageId],
    ) -> Result<Vec<(ImageId, AlphaLayer)>> {
        if policy != StitchOrder::Estimated {
            self.enter(StitchPhase::RemappingImages, Some(0));
            debug!(order = %policy, "No blend-order masks needed");
            return Ok(Vec::new());
        }
        self.enter(StitchPhase::RemappingImages, Some(images.len()));
        let masks = remap_order_masks(self.remapper, self.pano.options(), images)?;
        self.reporter.advance(masks.len());
        Ok(masks)
    }

    fn order(
        &mut self,
        policy: StitchOrder,
        images: &[ImageId],
        masks: Vec<(ImageId, AlphaLayer)>,
    ) -> Vec<ImageId> {
        match policy {
            StitchOrder::AsGiven => images.to_vec(),
            StitchOrder::Reversed => images.iter().rev().copied().collect(),
            StitchOrder::Estimated => {
                self.enter(StitchPhase::EstimatingBlendOrder, Some(images.len()));
                let order = order_from_masks(masks);
                info!(order = ?order, "Estimated blend order");
                order
            }
        }
    }

    /// Run the stitch and return the finished canvas.
    ///
    /// Any failure aborts the whole stitch; the stitcher returns to `Idle`.
    pub fn run(&mut self) -> Result<(StitchOutput, StitchReport)> {
        match self.execute() {
            Ok(done) => Ok(done),
            Err(err) => {
                if self.phase != StitchPhase::Idle {
                    self.reporter.finish_phase();
                }
                self.phase = StitchPhase::Idle;
                Err(err)
            }
        }
    }

    fn execute(&mut self) -> Result<(StitchOutput, StitchReport)> {
        let pano = self.pano;
        let images = pano.image_ids();
        let format = self.validate(&images)?;
        let options = pano.options();
        info!(
            images = images.len(),
            width = options.width,
            height = options.height,
            depth = %format.depth,
            wraparound = options.wraparound(),
            "Starting stitch"
        );

        let mut canvas = Canvas::new(options.width, options.height, format.channels, format.depth)?;
        let rois = self.compute_rois(&images)?;

        let (report, icc_profile) = match self.config.reduce {
            Some(mode) => {
                self.run_reduce(&mut canvas, &rois, ReduceStitcher::new(mode.reducer()))?
            }
            None => self.run_blend(&mut canvas, &rois)?,
        };

        let depth = self.output_depth(format.depth);
        if depth != canvas.image.depth {
            debug!(from = %canvas.image.depth, to = %depth, "Converting output depth");
            canvas.image.convert_depth(depth);
        }
        self.enter(StitchPhase::Done, None);
        info!(
            composited = report.composited.len(),
            skipped = report.skipped.len(),
            "Stitch complete"
        );

        Ok((
            StitchOutput {
                canvas,
                icc_profile,
                depth,
                compression: self.compression(),
            },
            report,
        ))
    }

    fn run_blend(
        &mut self,
        canvas: &mut Canvas,
        rois: &[(ImageId, Rect)],
    ) -> Result<(StitchReport, Vec<u8>)> {
        let mut report = StitchReport::default();
        let mut active = Vec::with_capacity(rois.len());
        for &(id, roi) in rois {
            if roi.is_empty() {
                info!(image = id, "Image does not touch the canvas, skipping");
                report.skipped.push(id);
            } else {
                active.push(id);
            }
        }
        let policy = self.config.effective_order();
        let masks = self.remap_blend_inputs(policy, &active)?;
        let order = self.order(policy, &active, masks);
        report.order = order.clone();

        let mut functor = self.config.blend.functor(&self.config.seam);
        let wraparound = self.pano.options().wraparound();
        self.enter(StitchPhase::Compositing, Some(order.len()));
        info!(blend = functor.name(), "Compositing");
        functor.prepare(canvas, wraparound)?;

        let mut icc_profile = Vec::new();
        for (i, &id) in order.iter().enumerate() {
            let roi = rois
                .iter()
                .find(|(rid, _)| *rid == id)
                .map(|&(_, roi)| roi)
                .unwrap_or_default();
            let image = remap_image(self.remapper, self.pano.options(), id, roi)?;
            if image.overlap(&canvas.bounds()).is_empty() {
                info!(image = id, bbox = %image.bbox, "Remapped image is empty, skipping");
                report.skipped.push(id);
                self.remapper.release(image);
                self.reporter.advance(i + 1);
                continue;
            }
            if icc_profile.is_empty() && !image.icc_profile.is_empty() {
                icc_profile = image.icc_profile.clone();
            }
            debug!(image = id, bbox = %image.bbox, "Folding image");
            functor.fold_image(canvas, &image)?;
            report.composited.push(id);
            self.remapper.release(image);
            self.reporter.advance(i + 1);
        }

        self.enter(StitchPhase::Finalizing, None);
        functor.finalize(canvas)?;
        Ok((report, icc_profile))
    }

    fn run_reduce(
        &mut self,
        canvas: &mut Canvas,
        rois: &[(ImageId, Rect)],
        stitcher: ReduceStitcher,
    ) -> Result<(StitchReport, Vec<u8>)> {
        let mut report = StitchReport::default();
        let mut active = Vec::with_capacity(rois.len());
        for &(id, roi) in rois {
            if roi.is_empty() {
                info!(image = id, "Image does not touch the canvas, skipping");
                report.skipped.push(id);
            } else {
                active.push((id, roi));
            }
        }

        self.enter(StitchPhase::RemappingImages, Some(active.len()));
        let remapper = self.remapper;
        let options = self.pano.options();
        let remapped: Vec<RemappedImage> = active
            .par_iter()
            .map(|&(id, roi)| remap_image(remapper, options, id, roi))
            .collect::<Result<_>>()?;
        self.reporter.advance(remapped.len());

        let bounds = canvas.bounds();
        let mut images = Vec::with_capacity(remapped.len());
        for image in remapped {
            if image.overlap(&bounds).is_empty() {
                info!(image = image.id, "Remapped image is empty, skipping");
                report.skipped.push(image.id);
                self.remapper.release(image);
            } else {
                report.order.push(image.id);
                report.composited.push(image.id);
                images.push(image);
            }
        }
        let icc_profile = images
            .iter()
            .map(|img| &img.icc_profile)
            .find(|icc| !icc.is_empty())
            .cloned()
            .unwrap_or_default();

        self.enter(StitchPhase::Compositing, Some(images.len()));
        stitcher.composite(canvas, &images);
        self.reporter.advance(images.len());
        for image in images {
            self.remapper.release(image);
        }

        self.enter(StitchPhase::Finalizing, None);
        Ok((report, icc_profile))
    }
}

/// Remap one image, attributing any failure to it.
pub(super) fn remap_image<R: Remapper + ?Sized>(
    remapper: &R,
    options: &PanoramaOptions,
    id: ImageId,
    roi: Rect,
) -> Result<RemappedImage> {
    remapper.remap(id, options, roi).map_err(|err| match err {
        StitchError::Remap { .. } => err,
        other => StitchError::Remap {
            image: id,
            reason: other.to_string(),
        },
    })
}

/// Stitch `pano` with a thread-safe progress reporter.
pub fn stitch_panorama_reported<P, R>(
    pano: &P,
    remapper: &R,
    config: &StitchConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<(StitchOutput, StitchReport)>
where
    P: PanoramaSource + ?Sized,
    R: Remapper + ?Sized,
{
    Stitcher::new(pano, remapper, config, reporter).run()
}

/// Stitch `pano` without progress reporting.
pub fn stitch_panorama<P, R>(
    pano: &P,
    remapper: &R,
    config: &StitchConfig,
) -> Result<(StitchOutput, StitchReport)>
where
    P: PanoramaSource + ?Sized,
    R: Remapper + ?Sized,
{
    stitch_panorama_reported(pano, remapper, config, Arc::new(NoOpReporter))
}

/// Stitch and hand the result to `writer`, either as one canvas or, when
/// `config.output.layers` is set, as one layer per image.
pub fn stitch_to_writer<P, R, W>(
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
    if config.output.layers {
        return super::layers::export_layers(pano, remapper, config, writer, reporter);
    }
    let (output, report) = stitch_panorama_reported(pano, remapper, config, reporter)?;
    writer.write(&output)?;
    Ok(report)
}
