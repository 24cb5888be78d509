#![allow(dead_code)]

use ndarray::{Array2, Array3};

use nadir_core::raster::{PixelDepth, Raster};
use nadir_core::remap::{Layer, LayerSet, PanoramaOptions};

/// Raster filled with one value in every channel.
pub fn constant_raster(
    width: usize,
    height: usize,
    channels: usize,
    value: f32,
    depth: PixelDepth,
) -> Raster {
    Raster::new(Array3::from_elem((height, width, channels), value), depth)
}

/// 8-bit raster whose samples are exact codes `(x + 2y + 7c) % 256`.
pub fn gradient_raster_u8(width: usize, height: usize, channels: usize) -> Raster {
    let data = Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        ((x + 2 * y + 7 * c) % 256) as f32 / 255.0
    });
    Raster::new(data, PixelDepth::U8)
}

/// Single-channel RGB raster with the given color.
pub fn solid_rgb(width: usize, height: usize, rgb: [f32; 3], depth: PixelDepth) -> Raster {
    let data = Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c]);
    Raster::new(data, depth)
}

/// Fixed-point plane with a deterministic, non-trivial pattern.
pub fn pattern_plane(width: usize, height: usize) -> Array2<i32> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        (((x * 37 + y * 91 + x * y * 13) % 256) as i32) << 8
    })
}

pub fn full_alpha(width: usize, height: usize) -> Array2<u8> {
    Array2::from_elem((height, width), 255)
}

/// Opaque layers on a `width x height` canvas.
pub fn layer_set(width: usize, height: usize, layers: Vec<Layer>) -> LayerSet {
    layer_set_with(PanoramaOptions::new(width, height), layers)
}

pub fn layer_set_with(options: PanoramaOptions, layers: Vec<Layer>) -> LayerSet {
    let mut set = LayerSet::new(options);
    for layer in layers {
        set.push(layer).unwrap();
    }
    set
}

/// Roll the columns of a plane right by `shift`.
pub fn roll_columns<T: Copy>(plane: &Array2<T>, shift: usize) -> Array2<T> {
    let w = plane.ncols();
    Array2::from_shape_fn(plane.dim(), |(y, x)| plane[[y, (x + w - shift % w) % w]])
}
