//! White balance: white-patch, gray-world, and a weighted blend of both.
//!
//! Both estimators compute one gain per channel and rescale the image
//! with it, clipping to the 8-bit range. A small epsilon in every
//! denominator keeps an all-black channel from dividing by zero; such a
//! channel simply stays black.

use crate::color::to_u8;
use crate::policy::WhiteBalanceBlend;
use crate::types::{Dimensions, RgbImage};

/// Guard added to every gain denominator.
pub const EPSILON: f32 = 1e-6;

/// Percentile of each channel that white-patch balance maps to 255.
pub const WHITE_PATCH_PERCENTILE: f64 = 99.0;

/// Scale each channel so its 99th percentile maps to 255.
#[must_use = "returns the balanced image"]
#[allow(clippy::cast_possible_truncation)]
pub fn white_patch(image: &RgbImage) -> RgbImage {
    let histograms = channel_histograms(image);
    let total = Dimensions::of(image).pixel_count();
    let gains = histograms.map(|hist| {
        let p = percentile(&hist, total, WHITE_PATCH_PERCENTILE) as f32;
        255.0 / (p + EPSILON)
    });
    scale_channels(image, gains)
}

/// Scale each channel so its mean equals the mean over all channels.
#[must_use = "returns the balanced image"]
#[allow(clippy::cast_possible_truncation)]
pub fn gray_world(image: &RgbImage) -> RgbImage {
    let means = channel_means(image);
    let gray = (means.iter().sum::<f64>() / 3.0) as f32;
    let gains = means.map(|m| gray / (m as f32 + EPSILON));
    scale_channels(image, gains)
}

/// Pixel-wise weighted combination of [`gray_world`] and [`white_patch`].
#[must_use = "returns the balanced image"]
pub fn blended(image: &RgbImage, blend: WhiteBalanceBlend) -> RgbImage {
    let gw = gray_world(image);
    let wp = white_patch(image);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let a = gw.get_pixel(x, y).0;
        let b = wp.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            to_u8(blend
                .gray_world
                .mul_add(f32::from(a[c]), blend.white_patch * f32::from(b[c])))
        }))
    })
}

/// Per-channel arithmetic means, `[0.0; 3]` for an empty image.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn channel_means(image: &RgbImage) -> [f64; 3] {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return [0.0; 3];
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, &v) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += u64::from(v);
        }
    }
    sums.map(|s| s as f64 / count as f64)
}

/// One 256-bin histogram per channel.
pub(crate) fn channel_histograms(image: &RgbImage) -> [[u64; 256]; 3] {
    let mut hists = [[0u64; 256]; 3];
    for pixel in image.pixels() {
        for (hist, &v) in hists.iter_mut().zip(pixel.0.iter()) {
            hist[usize::from(v)] += 1;
        }
    }
    hists
}

/// Percentile `q` (0..=100) of a histogram holding `total` samples,
/// interpolating linearly between the two nearest order statistics.
///
/// Returns 0 for an empty histogram.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn percentile(hist: &[u64; 256], total: u64, q: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let position = (q / 100.0).clamp(0.0, 1.0) * (total - 1) as f64;
    let lower_rank = position.floor() as u64;
    let upper_rank = position.ceil() as u64;
    let lower = value_at_rank(hist, lower_rank);
    let upper = value_at_rank(hist, upper_rank);
    let frac = position - position.floor();
    frac.mul_add(upper - lower, lower)
}

/// The value of the `rank`-th smallest sample (0-based).
fn value_at_rank(hist: &[u64; 256], rank: u64) -> f64 {
    let mut seen = 0u64;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > rank {
            return f64::from(u8::try_from(value).unwrap_or(u8::MAX));
        }
    }
    255.0
}

fn scale_channels(image: &RgbImage, gains: [f32; 3]) -> RgbImage {
    crate::color::map_pixels(image, |p| {
        std::array::from_fn(|c| to_u8(f32::from(p[c]) * gains[c]))
    })
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    /// Gradient whose channels top out at different levels.
    fn tinted_gradient() -> RgbImage {
        RgbImage::from_fn(64, 4, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 3) as u8;
            Rgb([v, v / 2, v / 4])
        })
    }

    #[test]
    fn percentile_interpolates() {
        let mut hist = [0u64; 256];
        hist[10] = 1;
        hist[20] = 1;
        assert!((percentile(&hist, 2, 50.0) - 15.0).abs() < 1e-9);
        assert!((percentile(&hist, 2, 0.0) - 10.0).abs() < 1e-9);
        assert!((percentile(&hist, 2, 100.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_of_empty_histogram() {
        assert!(percentile(&[0; 256], 0, 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn white_patch_stretches_each_channel_to_full_range() {
        let balanced = white_patch(&tinted_gradient());
        let hists = channel_histograms(&balanced);
        let total = 64 * 4;
        for hist in &hists {
            let p99 = percentile(hist, total, 99.0);
            assert!(p99 >= 250.0, "p99={p99}");
        }
    }

    #[test]
    fn gray_world_equalizes_channel_means() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 100, 50]));
        let balanced = gray_world(&img);
        let means = channel_means(&balanced);
        let gray = (200.0 + 100.0 + 50.0) / 3.0;
        for m in means {
            assert!((m - gray).abs() <= 1.0, "mean={m}, expected {gray}");
        }
    }

    #[test]
    fn neutral_image_unchanged_by_gray_world() {
        let img = RgbImage::from_pixel(5, 5, Rgb([128, 128, 128]));
        assert_eq!(gray_world(&img), img);
    }

    #[test]
    fn black_image_stays_black() {
        let img = RgbImage::new(6, 6);
        assert_eq!(white_patch(&img), img);
        assert_eq!(gray_world(&img), img);
        let blend = WhiteBalanceBlend {
            gray_world: 0.8,
            white_patch: 0.2,
        };
        assert_eq!(blended(&img, blend), img);
    }

    #[test]
    fn blend_weights_select_between_methods() {
        let img = tinted_gradient();
        let only_gw = blended(
            &img,
            WhiteBalanceBlend {
                gray_world: 1.0,
                white_patch: 0.0,
            },
        );
        assert_eq!(only_gw, gray_world(&img));
        let only_wp = blended(
            &img,
            WhiteBalanceBlend {
                gray_world: 0.0,
                white_patch: 1.0,
            },
        );
        assert_eq!(only_wp, white_patch(&img));
    }

    #[test]
    fn dimensions_preserved() {
        let img = RgbImage::new(13, 7);
        assert_eq!(white_patch(&img).dimensions(), (13, 7));
        assert_eq!(gray_world(&img).dimensions(), (13, 7));
    }
}
