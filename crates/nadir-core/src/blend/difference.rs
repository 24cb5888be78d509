use tracing::debug;

use crate::error::Result;
use crate::raster::Canvas;
use crate::remap::RemappedImage;

use super::{fold_valid_pixels, overlap_window, BlendFunctor};

/// Writes `|canvas - image|` where both are valid, exposing misregistration.
///
/// Where only the image is valid it is copied as is; canvas alpha follows the
/// image alpha like [`super::StackingBlender`].
#[derive(Clone, Debug, Default)]
pub struct DifferenceBlender;

impl BlendFunctor for DifferenceBlender {
    fn name(&self) -> &'static str {
        "difference"
    }

    fn fold_image(&mut self, canvas: &mut Canvas, image: &RemappedImage) -> Result<()> {
        let Some(window) = overlap_window(canvas, image) else {
            return Ok(());
        };
        debug!(image = image.id, window = %window.canvas, "Differencing image");
        fold_valid_pixels(canvas, image, &window, |mut dst, dst_alpha, src, src_alpha| {
            if *dst_alpha > 0 {
                dst.zip_mut_with(&src, |d, &s| *d = (*d - s).abs());
            } else {
                dst.assign(&src);
            }
            *dst_alpha = src_alpha;
        });
        Ok(())
    }
}
