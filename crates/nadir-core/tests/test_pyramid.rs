mod common;

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3, Axis};

use nadir_core::pyramid::{
    build_gaussian, build_laplacian, collapse, expand, filter_half_width, from_planes,
    max_levels, reduce, reduce_masked, reduce_n_times, reduced_dim, to_planes,
};
use nadir_core::raster::PixelDepth;

use common::{full_alpha, gradient_raster_u8, pattern_plane, roll_columns};

// ---------------------------------------------------------------------------
// Level arithmetic
// ---------------------------------------------------------------------------

#[test]
fn test_max_levels_small_sizes() {
    assert_eq!(max_levels(0, 5), 0);
    assert_eq!(max_levels(1, 1), 1);
    assert_eq!(max_levels(1, 100), 1);
    assert_eq!(max_levels(2, 2), 2);
    assert_eq!(max_levels(3, 3), 3);
    assert_eq!(max_levels(4, 4), 3);
    assert_eq!(max_levels(5, 3), 3);
    assert_eq!(max_levels(64, 16), 5);
}

#[test]
fn test_max_levels_is_capped() {
    assert_eq!(max_levels(1 << 40, 1 << 40), 29);
}

#[test]
fn test_filter_half_width() {
    assert_eq!(filter_half_width(1), 0);
    assert_eq!(filter_half_width(2), 4);
    assert_eq!(filter_half_width(6), 124);
}

#[test]
fn test_reduced_dim_rounds_up() {
    assert_eq!(reduced_dim(5, 4), (3, 2));
    assert_eq!(reduced_dim(1, 1), (1, 1));
}

// ---------------------------------------------------------------------------
// Reduce
// ---------------------------------------------------------------------------

#[test]
fn test_reduce_masked_constant_is_preserved() {
    for &(w, h) in &[(7, 5), (8, 6), (1, 1), (2, 9)] {
        for wrap in [false, true] {
            let image = Array2::<i32>::from_elem((h, w), 1234 << 8);
            let (out, alpha) = reduce_masked(wrap, image.view(), full_alpha(w, h).view()).unwrap();
            assert_eq!(out.dim(), (h.div_ceil(2), w.div_ceil(2)));
            assert!(out.iter().all(|&v| v == 1234 << 8));
            assert!(alpha.iter().all(|&a| a == 255));
        }
    }
}

#[test]
fn test_reduce_masked_all_invalid_gives_invalid() {
    let image = Array2::<f64>::from_elem((6, 6), 0.7);
    let alpha = Array2::<u8>::zeros((6, 6));
    let (out, out_alpha) = reduce_masked(false, image.view(), alpha.view()).unwrap();
    assert!(out.iter().all(|&v| v == 0.0));
    assert!(out_alpha.iter().all(|&a| a == 0));
}

#[test]
fn test_reduce_masked_ignores_invalid_pixels() {
    let mut image = Array2::<i32>::from_elem((4, 8), 100 << 8);
    let mut alpha = full_alpha(8, 4);
    for y in 0..4 {
        for x in 4..8 {
            image[[y, x]] = 9999 << 8;
            alpha[[y, x]] = 0;
        }
    }
    let (out, out_alpha) = reduce_masked(false, image.view(), alpha.view()).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(out[[y, x]], 100 << 8);
            assert_eq!(out_alpha[[y, x]], 255);
        }
        // Centred on column 6: taps 4..=8 are all invalid.
        assert_eq!(out[[y, 3]], 0);
        assert_eq!(out_alpha[[y, 3]], 0);
    }
}

#[test]
fn test_reduce_weights_constant_one() {
    let weights = Array2::<f32>::ones((9, 7));
    let out = reduce(false, weights.view()).unwrap();
    assert_eq!(out.dim(), (5, 4));
    assert!(out.iter().all(|&v| v == 1.0));
}

#[test]
fn test_reduce_weights_keep_range() {
    let weights = Array2::from_shape_fn((8, 8), |(_, x)| if x < 4 { 1.0f32 } else { 0.0 });
    let out = reduce(false, weights.view()).unwrap();
    assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(out[[0, 0]] > out[[0, 3]]);
}

#[test]
fn test_reduce_rejects_empty_source() {
    let empty = Array2::<f32>::zeros((0, 4));
    assert!(reduce(false, empty.view()).is_err());
}

#[test]
fn test_reduce_masked_wraparound_is_shift_invariant() {
    let image = pattern_plane(8, 6);
    let mut alpha = full_alpha(8, 6);
    alpha[[2, 7]] = 0;
    alpha[[3, 0]] = 0;

    let (base, base_alpha) = reduce_masked(true, image.view(), alpha.view()).unwrap();
    let (shifted, shifted_alpha) = reduce_masked(
        true,
        roll_columns(&image, 2).view(),
        roll_columns(&alpha, 2).view(),
    )
    .unwrap();

    assert_eq!(shifted, roll_columns(&base, 1));
    assert_eq!(shifted_alpha, roll_columns(&base_alpha, 1));
}

#[test]
fn test_reduce_n_times() {
    let image = pattern_plane(13, 9);
    let alpha = full_alpha(13, 9);
    let (same, same_alpha) = reduce_n_times(false, image.view(), alpha.view(), 0).unwrap();
    assert_eq!(same, image);
    assert_eq!(same_alpha, alpha);

    let (out, out_alpha) = reduce_n_times(false, image.view(), alpha.view(), 2).unwrap();
    assert_eq!(out.dim(), (3, 4));
    assert_eq!(out_alpha.dim(), (3, 4));
}

// ---------------------------------------------------------------------------
// Expand
// ---------------------------------------------------------------------------

#[test]
fn test_expand_constant_fills_both_parities() {
    for &(dh, dw) in &[(5usize, 7usize), (6, 8), (1, 1), (2, 2), (1, 6)] {
        let src = Array2::<i32>::from_elem((dh.div_ceil(2), dw.div_ceil(2)), 40 << 8);
        let mut dst = Array2::<i32>::zeros((dh, dw));
        expand(true, false, src.view(), dst.view_mut()).unwrap();
        assert!(dst.iter().all(|&v| v == 40 << 8), "size {dh}x{dw}");
    }
}

#[test]
fn test_expand_subtract_mode() {
    let src = Array2::<i32>::from_elem((3, 3), 10 << 8);
    let mut dst = Array2::<i32>::from_elem((5, 5), 25 << 8);
    expand(false, false, src.view(), dst.view_mut()).unwrap();
    assert!(dst.iter().all(|&v| v == 15 << 8));
}

#[test]
fn test_expand_rejects_mismatched_destination() {
    let src = Array2::<f64>::zeros((3, 3));
    let mut dst = Array2::<f64>::zeros((4, 8));
    assert!(expand(true, false, src.view(), dst.view_mut()).is_err());
}

#[test]
fn test_expand_wraparound_is_shift_invariant() {
    let src = pattern_plane(4, 3);
    let mut base = Array2::<i32>::zeros((6, 8));
    expand(true, true, src.view(), base.view_mut()).unwrap();

    let mut shifted = Array2::<i32>::zeros((6, 8));
    expand(true, true, roll_columns(&src, 1).view(), shifted.view_mut()).unwrap();
    assert_eq!(shifted, roll_columns(&base, 2));
}

/// Largest |a - b| over pixels at least `margin` away from every border.
fn interior_error<T>(a: &Array2<T>, b: &Array2<T>, margin: usize) -> f64
where
    T: Copy + Into<f64>,
{
    let (h, w) = a.dim();
    let mut worst = 0.0f64;
    for y in margin..h - margin {
        for x in margin..w - margin {
            let d: f64 = a[[y, x]].into() - b[[y, x]].into();
            worst = worst.max(d.abs());
        }
    }
    worst
}

#[test]
fn test_expand_of_reduce_restores_gradient_fixed_point() {
    let (h, w) = (33, 47);
    let image = Array2::<i32>::from_shape_fn((h, w), |(y, x)| ((3 * x + 2 * y) as i32) << 8);
    let alpha = full_alpha(w, h);

    let (small, _) = reduce_masked(false, image.view(), alpha.view()).unwrap();
    let mut restored = Array2::<i32>::zeros((h, w));
    expand(true, false, small.view(), restored.view_mut()).unwrap();

    // At most one 8-bit code away from the original inside the border.
    assert!(interior_error(&image, &restored, 5) <= 256.0);
}

#[test]
fn test_expand_of_reduce_restores_gradient_float() {
    let (h, w) = (33, 47);
    let image = Array2::<f64>::from_shape_fn((h, w), |(y, x)| 0.003 * x as f64 + 0.002 * y as f64);

    let small = reduce(false, image.view()).unwrap();
    let mut restored = Array2::<f64>::zeros((h, w));
    expand(true, false, small.view(), restored.view_mut()).unwrap();

    assert!(interior_error(&image, &restored, 5) < 1e-9);
}

// ---------------------------------------------------------------------------
// Laplacian build / collapse
// ---------------------------------------------------------------------------

#[test]
fn test_laplacian_collapse_is_lossless_fixed_point() {
    let plane = pattern_plane(13, 9);
    let image = plane.clone().insert_axis(Axis(0));
    let alpha = full_alpha(13, 9);
    for levels in 1..=5 {
        let pyramid = build_laplacian(&image, alpha.view(), levels, false).unwrap();
        assert_eq!(pyramid.len(), levels);
        let restored = collapse(pyramid).unwrap();
        assert_eq!(restored, image, "levels = {levels}");
    }
}

#[test]
fn test_laplacian_collapse_lossless_with_wraparound() {
    let image = pattern_plane(16, 10).insert_axis(Axis(0));
    let alpha = full_alpha(16, 10);
    let pyramid = build_laplacian(&image, alpha.view(), 4, true).unwrap();
    assert!(pyramid.wraparound());
    assert_eq!(collapse(pyramid).unwrap(), image);
}

#[test]
fn test_laplacian_collapse_zeroes_invalid_pixels() {
    let image = pattern_plane(12, 12).insert_axis(Axis(0));
    let alpha = Array2::from_shape_fn((12, 12), |(y, x)| if x + y < 14 { 255u8 } else { 0 });
    let pyramid = build_laplacian(&image, alpha.view(), 3, false).unwrap();
    let restored = collapse(pyramid).unwrap();

    for ((_, y, x), &v) in restored.indexed_iter() {
        if alpha[[y, x]] > 0 {
            assert_eq!(v, image[[0, y, x]]);
        } else {
            assert_eq!(v, 0);
        }
    }
}

#[test]
fn test_laplacian_collapse_float_is_close() {
    let image = Array3::from_shape_fn((2, 11, 15), |(c, y, x)| {
        (x as f64 * 0.013 + y as f64 * 0.029 + c as f64 * 0.31).sin().abs()
    });
    let alpha = full_alpha(15, 11);
    let pyramid = build_laplacian(&image, alpha.view(), 4, false).unwrap();
    let restored = collapse(pyramid).unwrap();
    for (a, b) in restored.iter().zip(image.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_laplacian_levels_are_clamped() {
    let image = pattern_plane(4, 4).insert_axis(Axis(0));
    let pyramid = build_laplacian(&image, full_alpha(4, 4).view(), 10, false).unwrap();
    assert_eq!(pyramid.len(), max_levels(4, 4));
}

#[test]
fn test_laplacian_weights_follow_alpha() {
    let image = pattern_plane(8, 8).insert_axis(Axis(0));
    let alpha = Array2::from_shape_fn((8, 8), |(_, x)| if x < 4 { 255u8 } else { 0 });
    let pyramid = build_laplacian(&image, alpha.view(), 3, false).unwrap();

    let level0 = &pyramid.level(0).weight;
    assert_eq!(level0[[0, 0]], 1.0);
    assert_eq!(level0[[0, 7]], 0.0);
    assert_eq!(pyramid.level(1).weight.dim(), (4, 4));
    assert_eq!(pyramid.level(2).image.dim(), (1, 2, 2));
}

#[test]
fn test_gaussian_pyramid_tracks_validity() {
    let image = Array3::<f64>::from_elem((1, 8, 8), 0.5);
    let alpha = Array2::from_shape_fn((8, 8), |(_, x)| if x < 2 { 255u8 } else { 0 });
    let pyramid = build_gaussian(&image, alpha.view(), 3, false).unwrap();

    let level1 = pyramid.level(1);
    assert_eq!(level1.weight[[0, 0]], 1.0);
    assert_eq!(level1.weight[[0, 3]], 0.0);
    assert_eq!(level1.image[[0, 0, 0]], 0.5);
}

// ---------------------------------------------------------------------------
// Raster <-> planes
// ---------------------------------------------------------------------------

#[test]
fn test_planes_round_trip_fixed_point() {
    let raster = gradient_raster_u8(9, 5, 3);
    let planes = to_planes::<i32>(&raster);
    assert_eq!(planes.dim(), (3, 5, 9));
    assert_eq!(planes[[2, 1, 4]], ((4 + 2 + 14) as i32) << 8);

    let back = from_planes(&planes, PixelDepth::U8);
    assert_eq!(back, raster);
}
