//! Edge-preserving bilateral smoothing.
//!
//! Each output pixel is a weighted mean of its neighbours. The weight is
//! the product of a spatial Gaussian on the distance to the centre and a
//! range Gaussian on the color difference, so pixels across a strong
//! edge get almost no weight and edges stay sharp while flat regions are
//! smoothed.

use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use serde::{Deserialize, Serialize};

use crate::types::RgbImage;

/// Bilateral filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralParams {
    /// Window diameter in pixels.
    pub diameter: u32,
    /// Range sigma, in 8-bit intensity units.
    pub sigma_color: f32,
    /// Spatial sigma, in pixels.
    pub sigma_space: f32,
}

impl BilateralParams {
    /// Heavy smoothing, also used for detail enhancement.
    pub const STRONG: Self = Self {
        diameter: 9,
        sigma_color: 75.0,
        sigma_space: 75.0,
    };

    /// Light smoothing.
    pub const MODERATE: Self = Self {
        diameter: 5,
        sigma_color: 50.0,
        sigma_space: 50.0,
    };
}

/// Apply a bilateral filter to every channel of `image`.
///
/// Wraps [`imageproc::filter::bilateral_filter`] with a square window of
/// radius `diameter / 2` and a Gaussian of the Euclidean RGB distance as
/// the range weight. A diameter below 2, a non-positive sigma or an
/// empty image returns the image unchanged (`imageproc` panics on zero
/// dimensions).
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(image: &RgbImage, params: BilateralParams) -> RgbImage {
    if params.diameter < 2 || params.sigma_color <= 0.0 || params.sigma_space <= 0.0 {
        return image.clone();
    }
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let radius = u8::try_from(params.diameter / 2).unwrap_or(u8::MAX);
    imageproc::filter::bilateral_filter(
        image,
        radius,
        params.sigma_space,
        GaussianEuclideanColorDistance::new(params.sigma_color),
    )
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn noisy_flat(seed: u32) -> RgbImage {
        RgbImage::from_fn(24, 24, |x, y| {
            let n = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ seed) % 21;
            #[allow(clippy::cast_possible_truncation)]
            let v = 118 + n as u8;
            Rgb([v, v, v])
        })
    }

    fn variance(img: &RgbImage) -> f64 {
        crate::stats::mean_std(img.pixels().map(|p| f64::from(p.0[0]))).1
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = RgbImage::from_pixel(12, 12, Rgb([40, 90, 200]));
        let out = bilateral_filter(&img, BilateralParams::STRONG);
        for (a, b) in out.pixels().zip(img.pixels()) {
            for (x, y) in a.0.iter().zip(b.0.iter()) {
                assert!(x.abs_diff(*y) <= 1, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn smoothing_reduces_noise() {
        let img = noisy_flat(7);
        let out = bilateral_filter(&img, BilateralParams::MODERATE);
        assert!(variance(&out) < variance(&img));
        let stronger = bilateral_filter(&img, BilateralParams::STRONG);
        assert!(variance(&stronger) < variance(&img));
    }

    #[test]
    fn hard_edge_survives() {
        let img = RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let out = bilateral_filter(&img, BilateralParams::MODERATE);
        assert!(out.get_pixel(9, 10).0[0] < 10, "{:?}", out.get_pixel(9, 10));
        assert!(out.get_pixel(10, 10).0[0] > 245, "{:?}", out.get_pixel(10, 10));
    }

    #[test]
    fn empty_image_passes_through() {
        let img = RgbImage::new(0, 7);
        assert_eq!(bilateral_filter(&img, BilateralParams::STRONG), img);
    }

    #[test]
    fn degenerate_settings_pass_through() {
        let img = noisy_flat(3);
        let off = BilateralParams {
            diameter: 1,
            ..BilateralParams::STRONG
        };
        assert_eq!(bilateral_filter(&img, off), img);
        let flat = BilateralParams {
            sigma_color: 0.0,
            ..BilateralParams::STRONG
        };
        assert_eq!(bilateral_filter(&img, flat), img);
    }

    #[test]
    fn tiny_images_keep_dimensions() {
        for (w, h) in [(1, 1), (2, 5), (9, 1)] {
            let img = RgbImage::from_pixel(w, h, Rgb([10, 20, 30]));
            assert_eq!(
                bilateral_filter(&img, BilateralParams::STRONG).dimensions(),
                (w, h)
            );
        }
    }
}
