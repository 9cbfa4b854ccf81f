//! Per-image signal statistics.
//!
//! [`compute`] measures the scalar descriptors the parameter policy
//! consumes: brightness, contrast, saturation spread and a noise
//! estimate. It is pure and deterministic, and never fails: an image with
//! no pixels yields all-zero statistics.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::types::RgbImage;

/// Scalar descriptors of one image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalStatistics {
    /// Mean of the grayscale projection (0..255).
    pub brightness: f64,
    /// Standard deviation of the grayscale projection.
    pub contrast: f64,
    /// Mean HSV saturation (0..255).
    pub saturation_mean: f64,
    /// Standard deviation of HSV saturation.
    pub saturation_std: f64,
    /// Standard deviation of the Laplacian of the grayscale projection.
    pub noise: f64,
}

/// Compute the signal statistics of `image`.
#[must_use]
pub fn compute(image: &RgbImage) -> SignalStatistics {
    if image.width() == 0 || image.height() == 0 {
        return SignalStatistics::default();
    }

    let gray = color::grayscale(image);
    let (brightness, contrast) = mean_std(gray.pixels().map(|p| f64::from(p.0[0])));
    let (saturation_mean, saturation_std) =
        mean_std(image.pixels().map(|p| f64::from(color::rgb_to_hsv(p.0).s)));

    SignalStatistics {
        brightness,
        contrast,
        saturation_mean,
        saturation_std,
        noise: laplacian_std(&gray),
    }
}

/// Standard deviation of the 4-neighbour discrete Laplacian.
///
/// Flat regions contribute zero, so the spread of the response tracks
/// high-frequency content: sensor noise and fine texture.
#[must_use]
pub fn laplacian_std(gray: &GrayImage) -> f64 {
    if gray.width() == 0 || gray.height() == 0 {
        return 0.0;
    }
    let response = imageproc::filter::laplacian_filter(gray);
    mean_std(response.pixels().map(|p| f64::from(p.0[0]))).1
}

/// Population mean and standard deviation of a sample stream.
///
/// Returns `(0.0, 0.0)` for an empty stream.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (count, sum, sum_sq) = values.fold((0u64, 0.0f64, 0.0f64), |(n, s, sq), v| {
        (n + 1, s + v, v.mul_add(v, sq))
    });
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    let mean = sum / n;
    let variance = mean.mul_add(-mean, sum_sq / n).max(0.0);
    (mean, variance.sqrt())
}
