use ndarray::{ArrayViewMut1, ArrayViewMut2, Axis, Zip};
use tracing::info;

use crate::consts::{ALPHA_OPAQUE, PARALLEL_PIXEL_THRESHOLD};
use crate::raster::Canvas;
use crate::reduce::{Contribution, PixelReducer};
use crate::remap::RemappedImage;

/// Stitcher that sees every image at once and reduces them pixel by pixel.
///
/// Unlike the blend functors nothing is folded incrementally: all remapped
/// images must be held in memory for the whole pass.
pub struct ReduceStitcher {
    reducer: Box<dyn PixelReducer>,
}

impl ReduceStitcher {
    pub fn new(reducer: Box<dyn PixelReducer>) -> Self {
        Self { reducer }
    }

    pub fn reducer_name(&self) -> &'static str {
        self.reducer.name()
    }

    /// Fill `canvas` from `images`. Pixels no image covers get alpha 0 and
    /// zero samples; all others get full alpha.
    pub fn composite(&self, canvas: &mut Canvas, images: &[RemappedImage]) {
        let (height, width) = canvas.alpha.dim();
        info!(
            reducer = self.reducer.name(),
            images = images.len(),
            width,
            height,
            "Reducing image stack"
        );

        let reducer = self.reducer.as_ref();
        let zip = Zip::indexed(canvas.image.data.axis_iter_mut(Axis(0)))
            .and(canvas.alpha.axis_iter_mut(Axis(0)));
        if height * width >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(|row, pixels, alpha| reduce_row(row, pixels, alpha, images, reducer));
        } else {
            zip.for_each(|row, pixels, alpha| reduce_row(row, pixels, alpha, images, reducer));
        }
    }
}

fn reduce_row(
    row: usize,
    mut pixels: ArrayViewMut2<'_, f32>,
    mut alpha: ArrayViewMut1<'_, u8>,
    images: &[RemappedImage],
    reducer: &dyn PixelReducer,
) {
    let y = row as i64;
    let active: Vec<&RemappedImage> = images
        .iter()
        .filter(|img| y >= img.bbox.top && y < img.bbox.bottom)
        .collect();
    let channels = pixels.ncols();
    let mut out = vec![0.0f32; channels];
    let mut contributions: Vec<Contribution<'_>> = Vec::with_capacity(active.len());

    for (col, (mut pixel, a)) in pixels
        .axis_iter_mut(Axis(0))
        .zip(alpha.iter_mut())
        .enumerate()
    {
        let x = col as i64;
        contributions.clear();
        for img in &active {
            let sa = img.alpha_at(x, y);
            if sa > 0 {
                let local = ((y - img.bbox.top) as usize, (x - img.bbox.left) as usize);
                contributions.push(Contribution {
                    value: img.image.pixel(local.0, local.1),
                    alpha: sa,
                });
            }
        }

        if contributions.is_empty() {
            pixel.fill(0.0);
            *a = 0;
            continue;
        }
        reducer.reduce(&contributions, &mut out);
        for (p, &o) in pixel.iter_mut().zip(out.iter()) {
            *p = o;
        }
        *a = ALPHA_OPAQUE;
    }
}
