//! Color space conversions used by the statistics and correction stages.
//!
//! - Grayscale projection with the BT.601 luma weights.
//! - HSV with hue in degrees and saturation/value on the 0..255 scale,
//!   matching how saturation statistics and thresholds are expressed.
//! - CIE L\*a\*b\* (D65, sRGB transfer curve) for luminance-only contrast
//!   equalization.
//!
//! Conversions work on `f32` so that a stage converting to a working
//! space and back only quantizes once, on the way out.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// BT.601 luma weights for R, G, B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Round and clamp a working value to an 8-bit channel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Luma of an RGB pixel, unrounded.
#[must_use]
pub fn luma(pixel: [u8; 3]) -> f32 {
    LUMA_WEIGHTS[0].mul_add(
        f32::from(pixel[0]),
        LUMA_WEIGHTS[1].mul_add(f32::from(pixel[1]), LUMA_WEIGHTS[2] * f32::from(pixel[2])),
    )
}

/// Project an RGB image onto 8-bit grayscale.
#[must_use = "returns the grayscale projection"]
pub fn grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([to_u8(luma(image.get_pixel(x, y).0))])
    })
}

/// A color in HSV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees, `0.0..360.0`.
    pub h: f32,
    /// Saturation, `0.0..=255.0`.
    pub s: f32,
    /// Value, `0.0..=255.0`.
    pub v: f32,
}

/// Convert an RGB pixel to HSV.
#[must_use]
pub fn rgb_to_hsv(pixel: [u8; 3]) -> Hsv {
    let [r, g, b] = pixel.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta <= 0.0 {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        60.0 * ((g - b) / delta)
    } else if (max - g).abs() < f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    Hsv { h, s, v: max }
}

/// Convert an HSV color back to an 8-bit RGB pixel.
///
/// Saturation outside `0..=255` is clamped first.
#[must_use]
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let s = hsv.s.clamp(0.0, 255.0) / 255.0;
    let v = hsv.v.clamp(0.0, 255.0);
    let chroma = v * s;
    let h = hsv.h.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - chroma;

    let (r, g, b) = match h {
        h if h < 1.0 => (chroma, x, 0.0),
        h if h < 2.0 => (x, chroma, 0.0),
        h if h < 3.0 => (0.0, chroma, x),
        h if h < 4.0 => (0.0, x, chroma),
        h if h < 5.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [to_u8(r + m), to_u8(g + m), to_u8(b + m)]
}

/// A color in CIE L\*a\*b\*.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness, `0.0..=100.0`.
    pub l: f32,
    /// Green-red axis.
    pub a: f32,
    /// Blue-yellow axis.
    pub b: f32,
}

/// D65 reference white.
const WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

const DELTA: f32 = 6.0 / 29.0;

fn srgb_to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055f32.mul_add(c.powf(1.0 / 2.4), -0.055)
    };
    encoded * 255.0
}

fn lab_f(t: f32) -> f32 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Convert an sRGB pixel to L\*a\*b\*.
#[must_use]
pub fn rgb_to_lab(pixel: [u8; 3]) -> Lab {
    let [r, g, b] = pixel.map(srgb_to_linear);

    let x = 0.180_437_5f32.mul_add(b, 0.412_456_4f32.mul_add(r, 0.357_576_1 * g));
    let y = 0.072_175f32.mul_add(b, 0.212_672_9f32.mul_add(r, 0.715_152_2 * g));
    let z = 0.950_304_1f32.mul_add(b, 0.019_333_9f32.mul_add(r, 0.119_192 * g));

    let fx = lab_f(x / WHITE[0]);
    let fy = lab_f(y / WHITE[1]);
    let fz = lab_f(z / WHITE[2]);

    Lab {
        l: 116.0f32.mul_add(fy, -16.0),
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert L\*a\*b\* back to an 8-bit sRGB pixel, clamping out-of-gamut
/// values.
#[must_use]
pub fn lab_to_rgb(lab: Lab) -> [u8; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let x = WHITE[0] * lab_f_inv(fx);
    let y = WHITE[1] * lab_f_inv(fy);
    let z = WHITE[2] * lab_f_inv(fz);

    let r = (-0.498_531_4f32).mul_add(z, 3.240_454_2f32.mul_add(x, -1.537_138_5 * y));
    let g = 0.041_556f32.mul_add(z, (-0.969_266f32).mul_add(x, 1.876_010_8 * y));
    let b = 1.057_225_2f32.mul_add(z, 0.055_643_4f32.mul_add(x, -0.204_025_9 * y));

    [r, g, b].map(|c| to_u8(linear_to_srgb(c)))
}

/// Apply `f` to every pixel of `image`, producing a new image of the
/// same dimensions.
pub(crate) fn map_pixels(image: &RgbImage, f: impl Fn([u8; 3]) -> [u8; 3]) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb(f(image.get_pixel(x, y).0))
    })
}
