mod common;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nadir_core::error::{Result, StitchError};
use nadir_core::geometry::Rect;
use nadir_core::raster::PixelDepth;
use nadir_core::remap::{
    AlphaLayer, ImageId, Layer, LayerSet, PanoramaOptions, RemappedImage, Remapper,
};
use nadir_core::stitch::{
    export_layers, stitch_panorama, stitch_panorama_reported, stitch_to_writer, BlendMode,
    CanvasWriter, NoOpReporter, ProgressReporter, ReduceMode, StitchConfig, StitchOrder,
    StitchOutput, StitchPhase, Stitcher,
};

use common::{constant_raster, layer_set, layer_set_with, solid_rgb};

fn config(blend: BlendMode, order: StitchOrder) -> StitchConfig {
    let mut config = StitchConfig::default();
    config.blend = blend;
    config.order = Some(order);
    config
}

fn gray(width: usize, value: f32, x: i64) -> Layer {
    Layer::opaque(constant_raster(width, 4, 1, value, PixelDepth::U8), x, 0)
}

/// Remapper that counts releases and can fail for one image.
struct Instrumented<'a> {
    inner: &'a LayerSet,
    fail: Option<ImageId>,
    released: AtomicUsize,
}

impl<'a> Instrumented<'a> {
    fn new(inner: &'a LayerSet, fail: Option<ImageId>) -> Self {
        Self {
            inner,
            fail,
            released: AtomicUsize::new(0),
        }
    }
}

impl Remapper for Instrumented<'_> {
    fn remap(&self, image: ImageId, options: &PanoramaOptions, roi: Rect) -> Result<RemappedImage> {
        if self.fail == Some(image) {
            return Err(StitchError::Io(io::Error::new(io::ErrorKind::Other, "disk gone")));
        }
        self.inner.remap(image, options, roi)
    }

    fn remap_alpha(&self, image: ImageId, options: &PanoramaOptions) -> Result<AlphaLayer> {
        self.inner.remap_alpha(image, options)
    }

    fn release(&self, _image: RemappedImage) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Recorder {
    begun: Mutex<Vec<StitchPhase>>,
    finished: AtomicUsize,
}

impl ProgressReporter for Recorder {
    fn begin_phase(&self, phase: StitchPhase, _total_items: Option<usize>) {
        self.begun.lock().unwrap().push(phase);
    }

    fn finish_phase(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MemoryWriter {
    canvases: Vec<StitchOutput>,
    layers: Vec<(ImageId, StitchOutput)>,
}

impl CanvasWriter for MemoryWriter {
    fn write(&mut self, output: &StitchOutput) -> Result<()> {
        self.canvases.push(output.clone());
        Ok(())
    }

    fn write_layer(&mut self, image: ImageId, output: &StitchOutput) -> Result<()> {
        self.layers.push((image, output.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_mixed_depth_rejected() {
    let set = layer_set(
        8,
        4,
        vec![
            gray(4, 0.5, 0),
            Layer::opaque(constant_raster(4, 4, 1, 0.5, PixelDepth::U16), 4, 0),
        ],
    );
    let result = stitch_panorama(&set, &set, &StitchConfig::default());
    assert!(matches!(result, Err(StitchError::Configuration(_))));
}

#[test]
fn test_mixed_channels_rejected() {
    let set = layer_set(
        8,
        4,
        vec![
            gray(4, 0.5, 0),
            Layer::opaque(solid_rgb(4, 4, [0.1, 0.2, 0.3], PixelDepth::U8), 4, 0),
        ],
    );
    let result = stitch_panorama(&set, &set, &StitchConfig::default());
    assert!(matches!(result, Err(StitchError::Configuration(_))));
}

#[test]
fn test_two_channel_images_rejected() {
    let set = layer_set(
        4,
        4,
        vec![Layer::opaque(constant_raster(4, 4, 2, 0.5, PixelDepth::U8), 0, 0)],
    );
    let result = stitch_panorama(&set, &set, &StitchConfig::default());
    assert!(matches!(result, Err(StitchError::Configuration(_))));
}

#[test]
fn test_empty_image_set_rejected() {
    let set = layer_set(8, 4, Vec::new());
    let result = stitch_panorama(&set, &set, &StitchConfig::default());
    assert!(matches!(result, Err(StitchError::EmptySequence)));
}

#[test]
fn test_empty_canvas_rejected() {
    let set = layer_set_with(PanoramaOptions::new(0, 4), vec![gray(4, 0.5, 0)]);
    let result = stitch_panorama(&set, &set, &StitchConfig::default());
    assert!(matches!(result, Err(StitchError::Configuration(_))));
}

#[test]
fn test_unknown_compression_rejected() {
    let set = layer_set(4, 4, vec![gray(4, 0.5, 0)]);
    let mut config = StitchConfig::default();
    config.output.compression = Some("lzma".into());
    let result = stitch_panorama(&set, &set, &config);
    assert!(matches!(result, Err(StitchError::Configuration(_))));

    config.output.compression = Some("best".into());
    let (output, _) = stitch_panorama(&set, &set, &config).unwrap();
    assert_eq!(output.compression.as_deref(), Some("best"));
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_remap_failure_names_the_image() {
    let set = layer_set(12, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4), gray(4, 0.6, 8)]);
    let remapper = Instrumented::new(&set, Some(1));
    let config = config(BlendMode::Stacking, StitchOrder::AsGiven);

    let mut stitcher = Stitcher::new(&set, &remapper, &config, Arc::new(NoOpReporter));
    match stitcher.run() {
        Err(StitchError::Remap { image, reason }) => {
            assert_eq!(image, 1);
            assert!(reason.contains("disk gone"));
        }
        other => panic!("expected a remap error, got {other:?}"),
    }
    assert_eq!(stitcher.phase(), StitchPhase::Idle);
}

#[test]
fn test_remap_failure_aborts_reduce() {
    let set = layer_set(8, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4)]);
    let remapper = Instrumented::new(&set, Some(0));
    let mut config = StitchConfig::default();
    config.reduce = Some(ReduceMode::Deviation);

    let result = stitch_panorama(&set, &remapper, &config);
    assert!(matches!(result, Err(StitchError::Remap { image: 0, .. })));
}

// ---------------------------------------------------------------------------
// Phases and progress
// ---------------------------------------------------------------------------

fn recorded_phases(config: &StitchConfig) -> (Vec<StitchPhase>, usize) {
    let set = layer_set(8, 4, vec![gray(5, 0.2, 0), gray(5, 0.4, 3)]);
    let reporter = Arc::new(Recorder::default());
    stitch_panorama_reported(&set, &set, config, reporter.clone()).unwrap();
    let begun = reporter.begun.lock().unwrap().clone();
    (begun, reporter.finished.load(Ordering::SeqCst))
}

#[test]
fn test_phases_with_estimated_order() {
    let (begun, finished) = recorded_phases(&config(BlendMode::Seam, StitchOrder::Estimated));
    assert_eq!(
        begun,
        vec![
            StitchPhase::ComputingRois,
            StitchPhase::RemappingImages,
            StitchPhase::EstimatingBlendOrder,
            StitchPhase::Compositing,
            StitchPhase::Finalizing,
        ]
    );
    assert_eq!(finished, begun.len());
}

#[test]
fn test_phases_with_fixed_order() {
    let (begun, finished) = recorded_phases(&config(BlendMode::Stacking, StitchOrder::Reversed));
    assert_eq!(
        begun,
        vec![
            StitchPhase::ComputingRois,
            StitchPhase::RemappingImages,
            StitchPhase::Compositing,
            StitchPhase::Finalizing,
        ]
    );
    assert_eq!(finished, begun.len());
}

#[test]
fn test_default_order_follows_blend_mode() {
    // Image 2 overlaps image 0; image 1 is disjoint from both.
    let set = layer_set(16, 4, vec![gray(5, 0.2, 0), gray(4, 0.4, 12), gray(5, 0.6, 2)]);

    let mut stacking = StitchConfig::default();
    stacking.blend = BlendMode::Stacking;
    let reporter = Arc::new(Recorder::default());
    let (_, report) = stitch_panorama_reported(&set, &set, &stacking, reporter.clone()).unwrap();
    assert_eq!(report.order, vec![0, 1, 2]);
    assert!(!reporter.begun.lock().unwrap().contains(&StitchPhase::EstimatingBlendOrder));

    let reporter = Arc::new(Recorder::default());
    let (_, report) =
        stitch_panorama_reported(&set, &set, &StitchConfig::default(), reporter.clone()).unwrap();
    assert_eq!(report.order, vec![0, 2, 1]);
    assert!(reporter.begun.lock().unwrap().contains(&StitchPhase::EstimatingBlendOrder));
}

#[test]
fn test_phases_with_reduce() {
    let mut config = StitchConfig::default();
    config.reduce = Some(ReduceMode::HdrMerge);
    let (begun, finished) = recorded_phases(&config);
    assert_eq!(
        begun,
        vec![
            StitchPhase::ComputingRois,
            StitchPhase::RemappingImages,
            StitchPhase::Compositing,
            StitchPhase::Finalizing,
        ]
    );
    assert_eq!(finished, begun.len());
}

#[test]
fn test_stitcher_ends_done() {
    let set = layer_set(4, 4, vec![gray(4, 0.5, 0)]);
    let config = StitchConfig::default();
    let mut stitcher = Stitcher::new(&set, &set, &config, Arc::new(NoOpReporter));
    assert_eq!(stitcher.phase(), StitchPhase::Idle);
    stitcher.run().unwrap();
    assert_eq!(stitcher.phase(), StitchPhase::Done);
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[test]
fn test_every_remapped_image_is_released() {
    let set = layer_set(12, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4), gray(4, 0.6, 8)]);
    let remapper = Instrumented::new(&set, None);
    stitch_panorama(&set, &remapper, &config(BlendMode::Stacking, StitchOrder::AsGiven)).unwrap();
    assert_eq!(remapper.released.load(Ordering::SeqCst), 3);

    let remapper = Instrumented::new(&set, None);
    let mut reduce = StitchConfig::default();
    reduce.reduce = Some(ReduceMode::Deviation);
    stitch_panorama(&set, &remapper, &reduce).unwrap();
    assert_eq!(remapper.released.load(Ordering::SeqCst), 3);
}

#[test]
fn test_off_canvas_image_is_skipped() {
    let set = layer_set(8, 4, vec![gray(4, 0.5, 0), gray(4, 0.5, 100)]);
    let remapper = Instrumented::new(&set, None);
    let (output, report) =
        stitch_panorama(&set, &remapper, &config(BlendMode::Seam, StitchOrder::Estimated)).unwrap();

    assert_eq!(report.order, vec![0]);
    assert_eq!(report.composited, vec![0]);
    assert_eq!(report.skipped, vec![1]);
    assert_eq!(remapper.released.load(Ordering::SeqCst), 1);
    assert_eq!(output.canvas.valid_count(), 16);
}

#[test]
fn test_icc_profile_from_first_image_that_has_one() {
    let mut second = gray(4, 0.4, 4);
    second.icc_profile = vec![1, 2, 3];
    let mut third = gray(4, 0.6, 8);
    third.icc_profile = vec![9];
    let set = layer_set(12, 4, vec![gray(4, 0.2, 0), second, third]);

    let (output, _) =
        stitch_panorama(&set, &set, &config(BlendMode::Stacking, StitchOrder::AsGiven)).unwrap();
    assert_eq!(output.icc_profile, vec![1, 2, 3]);
}

#[test]
fn test_output_depth_conversion() {
    let set = layer_set(4, 4, vec![gray(4, 0.5, 0)]);
    let mut config = StitchConfig::default();
    config.output.depth = Some(PixelDepth::U16);
    let (output, _) = stitch_panorama(&set, &set, &config).unwrap();
    assert_eq!(output.depth, PixelDepth::U16);
    assert_eq!(output.canvas.image.depth, PixelDepth::U16);
}

#[test]
fn test_panorama_output_depth_used_when_config_unset() {
    let mut options = PanoramaOptions::new(4, 4);
    options.output_depth = Some(PixelDepth::F32);
    let set = layer_set_with(options, vec![gray(4, 0.5, 0)]);
    let (output, _) = stitch_panorama(&set, &set, &StitchConfig::default()).unwrap();
    assert_eq!(output.depth, PixelDepth::F32);
}

#[test]
fn test_stitch_to_writer_writes_one_canvas() {
    let set = layer_set(8, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4)]);
    let mut writer = MemoryWriter::default();
    let report = stitch_to_writer(
        &set,
        &set,
        &config(BlendMode::Stacking, StitchOrder::AsGiven),
        &mut writer,
        Arc::new(NoOpReporter),
    )
    .unwrap();

    assert_eq!(report.composited, vec![0, 1]);
    assert_eq!(writer.canvases.len(), 1);
    assert!(writer.layers.is_empty());
    assert_eq!(writer.canvases[0].canvas.width(), 8);
}

// ---------------------------------------------------------------------------
// Layer export
// ---------------------------------------------------------------------------

#[test]
fn test_export_layers_one_canvas_per_image() {
    let mut first = gray(4, 0.2, 0);
    first.icc_profile = vec![7, 7];
    let set = layer_set(8, 4, vec![first, gray(4, 0.4, 100), gray(5, 0.6, 3)]);
    let mut writer = MemoryWriter::default();
    let report = export_layers(
        &set,
        &set,
        &StitchConfig::default(),
        &mut writer,
        Arc::new(NoOpReporter),
    )
    .unwrap();

    assert_eq!(report.composited, vec![0, 2]);
    assert_eq!(report.skipped, vec![1]);
    assert!(writer.canvases.is_empty());
    assert_eq!(writer.layers.len(), 2);

    let (id, layer) = &writer.layers[0];
    assert_eq!(*id, 0);
    assert_eq!(layer.canvas.width(), 8);
    assert_eq!(layer.canvas.valid_bounds(), Rect::new(0, 0, 4, 4));
    assert_eq!(layer.icc_profile, vec![7, 7]);

    let (id, layer) = &writer.layers[1];
    assert_eq!(*id, 2);
    assert_eq!(layer.canvas.valid_bounds(), Rect::new(3, 0, 8, 4));
    assert!(layer.icc_profile.is_empty());
}

#[test]
fn test_export_layers_remap_failure_names_the_image() {
    let set = layer_set(12, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4), gray(4, 0.6, 8)]);
    let remapper = Instrumented::new(&set, Some(1));
    let mut writer = MemoryWriter::default();
    let result = export_layers(
        &set,
        &remapper,
        &StitchConfig::default(),
        &mut writer,
        Arc::new(NoOpReporter),
    );

    match result {
        Err(StitchError::Remap { image, reason }) => {
            assert_eq!(image, 1);
            assert!(reason.contains("disk gone"));
        }
        other => panic!("expected a remap error, got {other:?}"),
    }
    assert_eq!(writer.layers.len(), 1);
}

#[test]
fn test_stitch_to_writer_exports_layers_when_requested() {
    let set = layer_set(8, 4, vec![gray(4, 0.2, 0), gray(4, 0.4, 4)]);
    let mut config = StitchConfig::default();
    config.output.layers = true;
    let mut writer = MemoryWriter::default();
    stitch_to_writer(&set, &set, &config, &mut writer, Arc::new(NoOpReporter)).unwrap();

    assert!(writer.canvases.is_empty());
    assert_eq!(writer.layers.len(), 2);
}
