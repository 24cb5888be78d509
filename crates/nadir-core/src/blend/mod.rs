//! Rules for folding one remapped image into the canvas.

pub mod difference;
pub mod order;
pub mod seam;
pub mod stacking;

use ndarray::{s, ArrayView1, ArrayViewMut1, Axis, Zip};

use crate::error::Result;
use crate::geometry::Rect;
use crate::raster::Canvas;
use crate::remap::RemappedImage;

pub use difference::DifferenceBlender;
pub use order::{estimate_order, order_from_masks, remap_order_masks};
pub use seam::{SeamBlender, SeamParams};
pub use stacking::StackingBlender;

/// A compositing rule applied image by image in blend order.
///
/// `prepare` runs once before the first image, `fold_image` once per image,
/// `finalize` once after the last. Only pixels inside the image's overlap
/// with the canvas may change during `fold_image`.
pub trait BlendFunctor: Send {
    fn name(&self) -> &'static str;

    fn prepare(&mut self, _canvas: &Canvas, _wraparound: bool) -> Result<()> {
        Ok(())
    }

    fn fold_image(&mut self, canvas: &mut Canvas, image: &RemappedImage) -> Result<()>;

    fn finalize(&mut self, _canvas: &mut Canvas) -> Result<()> {
        Ok(())
    }
}

/// Overlap of a remapped image with the canvas, in both coordinate frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Window {
    /// Overlap in canvas coordinates.
    pub canvas: Rect,
    /// The same pixels in the image's own buffer.
    pub local: Rect,
}

pub(crate) fn overlap_window(canvas: &Canvas, image: &RemappedImage) -> Option<Window> {
    let overlap = image.overlap(&canvas.bounds());
    if overlap.is_empty() {
        return None;
    }
    Some(Window {
        canvas: overlap,
        local: overlap.translate(-image.bbox.left, -image.bbox.top),
    })
}

/// Visit every overlapping pixel whose image alpha is non-zero.
///
/// The callback receives the canvas pixel, the canvas alpha, the image pixel
/// and the image alpha.
pub(crate) fn fold_valid_pixels(
    canvas: &mut Canvas,
    image: &RemappedImage,
    window: &Window,
    mut f: impl FnMut(ArrayViewMut1<'_, f32>, &mut u8, ArrayView1<'_, f32>, u8),
) {
    let c = window.canvas;
    let l = window.local;
    let mut dst = canvas.image.data.slice_mut(s![
        c.top as usize..c.bottom as usize,
        c.left as usize..c.right as usize,
        ..
    ]);
    let mut dst_alpha = canvas.alpha.slice_mut(s![
        c.top as usize..c.bottom as usize,
        c.left as usize..c.right as usize
    ]);
    let src = image.image.data.slice(s![
        l.top as usize..l.bottom as usize,
        l.left as usize..l.right as usize,
        ..
    ]);
    let src_alpha = image.alpha.slice(s![
        l.top as usize..l.bottom as usize,
        l.left as usize..l.right as usize
    ]);

    Zip::from(dst.lanes_mut(Axis(2)))
        .and(&mut dst_alpha)
        .and(src.lanes(Axis(2)))
        .and(&src_alpha)
        .for_each(|d, da, s, &sa| {
            if sa > 0 {
                f(d, da, s, sa);
            }
        });
}
