//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Decode-time reduction plus the precise correction applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleResult {
    /// Power of two, at least 1. The decoder shrinks each axis by this much.
    pub pre_scale_factor: u32,
    /// `1 / target_ratio`, in (0, 1].
    pub residual_ratio: f64,
}

impl ScaleResult {
    /// Uniform scale the transform applies to the pre-scaled bitmap.
    ///
    /// Decoding already divided each axis by `pre_scale_factor`, so the
    /// end-to-end scale relative to the source stays `residual_ratio`.
    pub fn transform_scale(&self) -> f64 {
        self.pre_scale_factor as f64 * self.residual_ratio
    }
}

/// Calculate the pre-scale factor and residual ratio for fitting `source`
/// inside `bounds`.
///
/// A bound of `0`, or one at least as large as the source, leaves that axis
/// alone (ratio 1.0). The stricter axis wins. The pre-scale factor is the
/// largest power of two that still leaves a ratio above 1.0 to be corrected.
///
/// # Examples
/// ```
/// # use reframe::imaging::calculate_scale;
/// let scale = calculate_scale((4000, 3000), (1024, 768));
/// assert_eq!(scale.pre_scale_factor, 2);
/// assert!((scale.residual_ratio - 0.256).abs() < 1e-9);
/// ```
pub fn calculate_scale(source: (u32, u32), bounds: (u32, u32)) -> ScaleResult {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    debug_assert!(src_w > 0 && src_h > 0, "source geometry must be positive");

    let axis_ratio = |src: u32, max: u32| {
        if max != 0 && max < src {
            src as f64 / max as f64
        } else {
            1.0
        }
    };

    let mut target_ratio = axis_ratio(src_w, max_w).max(axis_ratio(src_h, max_h));
    let residual_ratio = 1.0 / target_ratio;

    let mut pre_scale_factor = 1;
    while target_ratio / 2.0 > 1.0 {
        pre_scale_factor *= 2;
        target_ratio /= 2.0;
    }

    ScaleResult {
        pre_scale_factor,
        residual_ratio,
    }
}

/// Dimensions produced by decoding `source` with a power-of-two reduction.
///
/// Partial blocks round up, as sub-sampling decoders do.
pub fn calculate_decoded_dimensions(source: (u32, u32), pre_scale_factor: u32) -> (u32, u32) {
    let factor = pre_scale_factor.max(1);
    (
        source.0.div_ceil(factor).max(1),
        source.1.div_ceil(factor).max(1),
    )
}

/// Output extent of rotating then uniformly scaling a bitmap.
///
/// `offset_x` / `offset_y` translate the rotated, scaled rectangle back into
/// positive coordinates so that its bounding box starts at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformExtent {
    pub width: u32,
    pub height: u32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Whether `degrees` lands on 0, 90, 180 or 270 after wrapping.
pub fn is_right_angle(degrees: i32) -> bool {
    degrees.rem_euclid(90) == 0
}

/// Calculate the bounding box of the rotate-then-scale transform.
///
/// Rotation is clockwise in image coordinates (y grows downwards) and wraps
/// modulo 360. Right angles are computed exactly; other angles use the
/// rounded axis-aligned bounding box of the transformed corners.
///
/// Fed the full source size and [`ScaleResult::residual_ratio`], the result
/// never exceeds the bounds the scale was computed for.
pub fn calculate_transform_extent(
    size: (u32, u32),
    rotation: i32,
    scale: f64,
) -> TransformExtent {
    let (w, h) = (size.0 as f64, size.1 as f64);
    let degrees = rotation.rem_euclid(360);
    let to_px = |v: f64| (v.round() as u32).max(1);

    if is_right_angle(degrees) {
        let (rw, rh) = if degrees == 90 || degrees == 270 {
            (h, w)
        } else {
            (w, h)
        };
        return TransformExtent {
            width: to_px(rw * scale),
            height: to_px(rh * scale),
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }

    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| {
        (
            (x * cos - y * sin) * scale,
            (x * sin + y * cos) * scale,
        )
    });

    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    TransformExtent {
        width: to_px(max_x - min_x),
        height: to_px(max_y - min_y),
        offset_x: -min_x as f32,
        offset_y: -min_y as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_scale tests
    // =========================================================================

    #[test]
    fn scale_4000x3000_into_1024x768() {
        let scale = calculate_scale((4000, 3000), (1024, 768));
        assert_eq!(scale.pre_scale_factor, 2);
        assert!((scale.residual_ratio - 1.0 / 3.90625).abs() < 1e-12);
        assert!((scale.transform_scale() - 0.512).abs() < 1e-12);
    }

    #[test]
    fn scale_exact_power_of_two_stops_before_one() {
        // 8x: 8 → 4 → 2, then 2/2 == 1 is not > 1
        let scale = calculate_scale((4000, 4000), (500, 500));
        assert_eq!(scale.pre_scale_factor, 4);
        assert_eq!(scale.residual_ratio, 0.125);
    }

    #[test]
    fn scale_unbounded_is_identity() {
        let scale = calculate_scale((4000, 3000), (0, 0));
        assert_eq!(scale.pre_scale_factor, 1);
        assert_eq!(scale.residual_ratio, 1.0);
    }

    #[test]
    fn scale_looser_bounds_are_identity() {
        let scale = calculate_scale((640, 480), (1920, 1080));
        assert_eq!(scale.pre_scale_factor, 1);
        assert_eq!(scale.residual_ratio, 1.0);
    }

    #[test]
    fn scale_unbounded_axis_defers_to_other_axis() {
        // Height unbounded, width halves
        let scale = calculate_scale((2000, 9000), (1000, 0));
        assert_eq!(scale.pre_scale_factor, 1);
        assert_eq!(scale.residual_ratio, 0.5);
    }

    #[test]
    fn scale_stricter_axis_wins() {
        // width ratio 2, height ratio 5
        let scale = calculate_scale((2000, 5000), (1000, 1000));
        assert_eq!(scale.residual_ratio, 0.2);
        assert_eq!(scale.pre_scale_factor, 4);
    }

    #[test]
    fn scale_properties_hold_across_inputs() {
        let sources = [(1, 1), (3, 7), (640, 480), (4000, 3000), (12000, 800)];
        let bounds = [(0, 0), (1, 1), (100, 0), (0, 333), (1024, 768), (50000, 2)];

        for &source in &sources {
            for &bound in &bounds {
                let scale = calculate_scale(source, bound);
                let ratio = |src: u32, max: u32| {
                    if max != 0 && max < src {
                        src as f64 / max as f64
                    } else {
                        1.0
                    }
                };
                let target = ratio(source.0, bound.0).max(ratio(source.1, bound.1));

                assert!(scale.pre_scale_factor.is_power_of_two());
                assert!(scale.pre_scale_factor as f64 <= target);
                assert!((scale.residual_ratio * target - 1.0).abs() < 1e-9);
                assert!(scale.residual_ratio > 0.0 && scale.residual_ratio <= 1.0);
            }
        }
    }

    // =========================================================================
    // calculate_decoded_dimensions tests
    // =========================================================================

    #[test]
    fn decoded_dimensions_divide_evenly() {
        assert_eq!(calculate_decoded_dimensions((4000, 3000), 2), (2000, 1500));
    }

    #[test]
    fn decoded_dimensions_round_up_partial_blocks() {
        assert_eq!(calculate_decoded_dimensions((1001, 3), 4), (251, 1));
    }

    #[test]
    fn decoded_dimensions_factor_one_is_identity() {
        assert_eq!(calculate_decoded_dimensions((37, 41), 1), (37, 41));
    }

    // =========================================================================
    // calculate_transform_extent tests
    // =========================================================================

    #[test]
    fn extent_scales_without_rotation() {
        let extent = calculate_transform_extent((2000, 1500), 0, 0.512);
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn extent_swaps_for_quarter_turns() {
        let extent = calculate_transform_extent((2000, 1500), 90, 0.512);
        assert_eq!((extent.width, extent.height), (768, 1024));

        let extent = calculate_transform_extent((2000, 1500), 270, 0.5);
        assert_eq!((extent.width, extent.height), (750, 1000));
    }

    #[test]
    fn extent_wraps_rotation() {
        let a = calculate_transform_extent((300, 200), 450, 1.0);
        let b = calculate_transform_extent((300, 200), 90, 1.0);
        let c = calculate_transform_extent((300, 200), -270, 1.0);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!((a.width, a.height), (200, 300));
    }

    #[test]
    fn extent_for_arbitrary_angle_is_bounding_box() {
        // 100x100 rotated 45° → diagonal ≈ 141.42
        let extent = calculate_transform_extent((100, 100), 45, 1.0);
        assert_eq!((extent.width, extent.height), (141, 141));
        // Top-left corner moves left of the origin, so the offset pushes it back.
        assert!((extent.offset_x - 70.71).abs() < 0.01);
        assert!(extent.offset_y.abs() < 1e-4);
    }

    #[test]
    fn extent_from_source_stays_within_bounds() {
        let widths = [401, 1001, 4001, 257, 999, 7];
        let heights = [10, 401, 3001, 1];
        let bounds = [(100, 0), (0, 100), (64, 64), (333, 7), (1, 1)];

        for &w in &widths {
            for &h in &heights {
                for &(max_w, max_h) in &bounds {
                    let scale = calculate_scale((w, h), (max_w, max_h));
                    let limit = |max: u32, src: u32| if max == 0 { src } else { max.min(src) };
                    let (lim_w, lim_h) = (limit(max_w, w), limit(max_h, h));

                    let upright = calculate_transform_extent((w, h), 0, scale.residual_ratio);
                    assert!(
                        upright.width <= lim_w && upright.height <= lim_h,
                        "{w}x{h} into {max_w}x{max_h} gave {}x{}",
                        upright.width,
                        upright.height
                    );

                    // Bounds apply to the source axes, so a quarter turn swaps them.
                    let turned = calculate_transform_extent((w, h), 90, scale.residual_ratio);
                    assert!(turned.width <= lim_h && turned.height <= lim_w);
                }
            }
        }
    }

    #[test]
    fn extent_401_wide_into_100_is_exactly_100() {
        let scale = calculate_scale((401, 10), (100, 0));
        assert_eq!(scale.pre_scale_factor, 4);
        let extent = calculate_transform_extent((401, 10), 0, scale.residual_ratio);
        assert_eq!(extent.width, 100);
    }

    #[test]
    fn extent_never_collapses_to_zero() {
        let extent = calculate_transform_extent((1, 1), 0, 0.01);
        assert_eq!((extent.width, extent.height), (1, 1));
    }

    #[test]
    fn right_angle_detection() {
        assert!(is_right_angle(0));
        assert!(is_right_angle(-90));
        assert!(is_right_angle(630));
        assert!(!is_right_angle(45));
        assert!(!is_right_angle(-1));
    }
}
