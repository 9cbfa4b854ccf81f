//! 3x3 convolution sharpening.
//!
//! The kernel strength follows the quality tier. Every kernel sums to 1,
//! so flat regions keep their level and only local differences are
//! amplified.

use imageproc::kernel::Kernel;

use crate::types::{QualityTier, RgbImage};

/// 3x3 kernel weights in row-major order.
pub type Weights = [f32; 9];

/// Full 8-neighbour sharpening used by the high tier.
#[rustfmt::skip]
pub const STRONG: Weights = [
    -1.0, -1.0, -1.0,
    -1.0,  9.0, -1.0,
    -1.0, -1.0, -1.0,
];

/// 4-neighbour unsharp kernel used by the standard tier.
#[rustfmt::skip]
pub const MODERATE: Weights = [
     0.0, -1.0,  0.0,
    -1.0,  5.0, -1.0,
     0.0, -1.0,  0.0,
];

/// Half-strength 4-neighbour kernel used by the fast tier.
#[rustfmt::skip]
pub const WEAK: Weights = [
     0.0, -0.5,  0.0,
    -0.5,  3.0, -0.5,
     0.0, -0.5,  0.0,
];

/// The sharpening weights for a quality tier.
#[must_use]
pub const fn kernel_for(quality: QualityTier) -> &'static Weights {
    match quality {
        QualityTier::Fast => &WEAK,
        QualityTier::Standard => &MODERATE,
        QualityTier::High => &STRONG,
    }
}

/// Sharpen `image` with the kernel of `quality`.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &RgbImage, quality: QualityTier) -> RgbImage {
    convolve3x3(image, kernel_for(quality))
}

/// Convolve every channel with a 3x3 kernel.
///
/// Wraps [`imageproc::filter::filter_clamped`]: borders are handled by
/// clamping coordinates to the image and results are clipped to 0..=255.
#[must_use = "returns the convolved image"]
pub fn convolve3x3(image: &RgbImage, weights: &Weights) -> RgbImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    imageproc::filter::filter_clamped::<_, f32, u8>(image, Kernel::new(weights, 3, 3))
}
