use tracing::debug;

use crate::error::Result;
use crate::raster::Canvas;
use crate::remap::RemappedImage;

use super::{fold_valid_pixels, overlap_window, BlendFunctor};

/// Plain alpha-masked overwrite: later images cover earlier ones.
#[derive(Clone, Debug, Default)]
pub struct StackingBlender;

impl BlendFunctor for StackingBlender {
    fn name(&self) -> &'static str {
        "stacking"
    }

    fn fold_image(&mut self, canvas: &mut Canvas, image: &RemappedImage) -> Result<()> {
        let Some(window) = overlap_window(canvas, image) else {
            return Ok(());
        };
        debug!(image = image.id, window = %window.canvas, "Stacking image");
        fold_valid_pixels(canvas, image, &window, |mut dst, dst_alpha, src, src_alpha| {
            dst.assign(&src);
            *dst_alpha = src_alpha;
        });
        Ok(())
    }
}
