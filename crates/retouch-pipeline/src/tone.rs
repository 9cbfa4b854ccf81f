//! Tone remapping: min/max range stretch and gamma curves.

use crate::color::to_u8;
use crate::types::RgbImage;

/// Gamma exponent of the tone mapping stage.
pub const TONE_MAPPING_GAMMA: f32 = 0.7;

/// Gamma exponent applied by color grading before its saturation boost.
pub const COLOR_GRADING_GAMMA: f32 = 0.8;

/// Stretch the intensity range so the darkest subpixel maps to 0 and
/// the brightest to 255.
///
/// Minimum and maximum are taken over all channels together, so the
/// stretch does not shift color balance. A flat image (including an
/// all-black one) is returned unchanged.
#[must_use = "returns the stretched image"]
pub fn stretch(image: &RgbImage) -> RgbImage {
    let raw = image.as_raw();
    let (Some(&min), Some(&max)) = (raw.iter().min(), raw.iter().max()) else {
        return image.clone();
    };
    if max <= min {
        return image.clone();
    }

    let lo = f32::from(min);
    let scale = 255.0 / (f32::from(max) - lo);
    apply_lut(image, &std::array::from_fn(|v| {
        #[allow(clippy::cast_precision_loss)]
        let v = v as f32;
        to_u8((v - lo).max(0.0) * scale)
    }))
}

/// Apply `out = 255 * (in / 255) ^ exponent` to every channel.
///
/// Exponents below 1 lift shadows and midtones.
#[must_use = "returns the remapped image"]
pub fn gamma(image: &RgbImage, exponent: f32) -> RgbImage {
    apply_lut(image, &gamma_lut(exponent))
}

/// The 256-entry lookup table for a gamma curve.
#[must_use]
pub fn gamma_lut(exponent: f32) -> [u8; 256] {
    std::array::from_fn(|v| {
        #[allow(clippy::cast_precision_loss)]
        let normalized = v as f32 / 255.0;
        to_u8(normalized.powf(exponent) * 255.0)
    })
}

fn apply_lut(image: &RgbImage, lut: &[u8; 256]) -> RgbImage {
    crate::color::map_pixels(image, |p| p.map(|v| lut[usize::from(v)]))
}
