//! Saturation scaling in HSV space.

use crate::color::{self, Hsv};
use crate::tone;
use crate::types::RgbImage;

/// Saturation multiplier of the color grading stage.
pub const COLOR_GRADING_BOOST: f32 = 1.1;

/// Multiply the HSV saturation of every pixel by `factor`, clipping to
/// the valid range. Hue and value are kept.
///
/// A factor of exactly 1 returns the input unchanged.
#[must_use = "returns the adjusted image"]
pub fn adjust_saturation(image: &RgbImage, factor: f32) -> RgbImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return image.clone();
    }
    color::map_pixels(image, |p| {
        let hsv = color::rgb_to_hsv(p);
        color::hsv_to_rgb(Hsv {
            s: (hsv.s * factor).clamp(0.0, 255.0),
            ..hsv
        })
    })
}

/// Warm film-like grade: gamma 0.8 then a fixed saturation boost.
#[must_use = "returns the graded image"]
pub fn color_grade(image: &RgbImage) -> RgbImage {
    adjust_saturation(
        &tone::gamma(image, tone::COLOR_GRADING_GAMMA),
        COLOR_GRADING_BOOST,
    )
}
