//! Blend order estimation.
//!
//! Images are ordered so that each one overlaps as much as possible with what
//! has already been placed, which keeps seams short during multiband blending.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::debug;

use crate::consts::BLEND_ORDER_MASK_WIDTH;
use crate::error::Result;
use crate::geometry::Rect;
use crate::remap::{AlphaLayer, ImageId, PanoramaOptions, Remapper};

/// Pixels of `region` that are valid in both masks.
fn overlap_pixel_count(a: &AlphaLayer, b: &AlphaLayer, region: &Rect) -> usize {
    let mut count = 0;
    for y in region.top..region.bottom {
        for x in region.left..region.right {
            if a.alpha_at(x, y) > 0 && b.alpha_at(x, y) > 0 {
                count += 1;
            }
        }
    }
    count
}

/// Remap the low-resolution alpha masks the order is estimated from, one per
/// distinct image, sorted by image index.
pub fn remap_order_masks<R: Remapper + ?Sized>(
    remapper: &R,
    options: &PanoramaOptions,
    images: &[ImageId],
) -> Result<Vec<(ImageId, AlphaLayer)>> {
    let ids: Vec<ImageId> = images.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let small = options.scaled_to_width(BLEND_ORDER_MASK_WIDTH.min(options.width.max(1)));
    ids.par_iter()
        .map(|&id| remapper.remap_alpha(id, &small).map(|mask| (id, mask)))
        .collect()
}

/// Order images by their blend-order masks.
///
/// The first mask seeds the order. Each step then picks the remaining image
/// whose mask shares the most valid pixels with the seed mask inside the
/// accumulated bounding box, ties going to the earlier mask. Only the bounding
/// box grows as images are placed; the masks of placed images are not merged.
/// Images without any overlap are still appended, so disconnected panoramas
/// get a best-effort order.
pub fn order_from_masks(masks: Vec<(ImageId, AlphaLayer)>) -> Vec<ImageId> {
    let mut remaining = masks;
    if remaining.is_empty() {
        return Vec::new();
    }
    let (seed_id, seed) = remaining.remove(0);
    let mut placed_bbox = seed.bbox;
    let mut order = vec![seed_id];

    while !remaining.is_empty() {
        let mut chosen = 0;
        let mut best = 0;
        for (i, (_, mask)) in remaining.iter().enumerate() {
            let region = mask.bbox.intersect(&placed_bbox);
            // The pixel count can never exceed the region area.
            if region.area() <= best {
                continue;
            }
            let count = overlap_pixel_count(&seed, mask, &region);
            if count > best {
                best = count;
                chosen = i;
            }
        }

        let (id, mask) = remaining.remove(chosen);
        debug!(image = id, overlap = best, "Next image in blend order");
        placed_bbox = placed_bbox.union(&mask.bbox);
        order.push(id);
    }

    order
}

/// Order `images` for compositing, seeded by the lowest image index.
pub fn estimate_order<R: Remapper + ?Sized>(
    remapper: &R,
    options: &PanoramaOptions,
    images: &[ImageId],
) -> Result<Vec<ImageId>> {
    let masks = remap_order_masks(remapper, options, images)?;
    Ok(order_from_masks(masks))
}
