//! Diagnostic image analysis.
//!
//! Purely informational: the results are attached to batch reports and
//! are never consulted by the parameter policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, ParseTagError, RgbImage};
use crate::{color, stats, white_balance};

/// Mean brightness above which an image is reported overexposed.
pub const OVEREXPOSED_BRIGHTNESS: f64 = 200.0;
/// Mean brightness below which an image is reported underexposed.
pub const UNDEREXPOSED_BRIGHTNESS: f64 = 50.0;
/// Noise estimate above which an image is flagged noisy.
pub const HIGH_NOISE: f64 = 30.0;

/// A diagnostic analysis a job can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    /// Per-channel distribution summary.
    #[serde(rename = "histogramAnalysis")]
    Histogram,
    /// Brightness classification.
    #[serde(rename = "exposureAnalysis")]
    Exposure,
    /// Warm/cool cast.
    #[serde(rename = "colorAnalysis")]
    Color,
    /// Laplacian noise estimate.
    #[serde(rename = "noiseAnalysis")]
    Noise,
}

impl AnalysisKind {
    /// Every analysis kind.
    pub const ALL: [Self; 4] = [Self::Histogram, Self::Exposure, Self::Color, Self::Noise];

    /// The configuration tag of this analysis.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Histogram => "histogramAnalysis",
            Self::Exposure => "exposureAnalysis",
            Self::Color => "colorAnalysis",
            Self::Noise => "noiseAnalysis",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AnalysisKind {
    type Err = ParseTagError;

    /// Accepts the full tag (`noiseAnalysis`, `noise_analysis`) or the
    /// short name (`noise`), ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|&c| c != '_' && c != '-')
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| {
                let tag = kind.tag();
                tag.eq_ignore_ascii_case(&wanted)
                    || tag
                        .strip_suffix("Analysis")
                        .is_some_and(|short| short.eq_ignore_ascii_case(&wanted))
            })
            .ok_or_else(|| ParseTagError::new("analysis", s))
    }
}

/// Distribution summary of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (50th percentile).
    pub median: f64,
    /// Smallest value present.
    pub min: u8,
    /// Largest value present.
    pub max: u8,
}

/// Histogram analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Number of pixels.
    pub total_pixels: u64,
    /// Red, green and blue summaries.
    pub channels: [ChannelSummary; 3],
    /// Fraction of pixels that are pure black.
    pub clipped_shadows: f64,
    /// Fraction of pixels that are pure white.
    pub clipped_highlights: f64,
}

/// Exposure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// Mean brightness above the overexposure cutoff.
    Overexposed,
    /// Mean brightness below the underexposure cutoff.
    Underexposed,
    /// Anything in between.
    Normal,
}

/// Exposure analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    /// Mean grayscale brightness.
    pub mean_brightness: f64,
    /// Classification of the mean.
    pub status: Exposure,
}

/// Color temperature class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTemperature {
    /// Red mean exceeds blue mean.
    Warm,
    /// Blue mean at least equals red mean.
    Cool,
}

/// Color analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSummary {
    /// Red, green and blue means.
    pub channel_means: [f64; 3],
    /// Warm or cool cast.
    pub temperature: ColorTemperature,
}

/// Noise analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseSummary {
    /// Laplacian standard deviation.
    pub noise_level: f64,
    /// Whether the estimate exceeds [`HIGH_NOISE`].
    pub high_noise: bool,
}

/// The requested analyses of one image. Unrequested fields are `None`
/// and omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Histogram summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramSummary>,
    /// Exposure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<ExposureSummary>,
    /// Color cast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorSummary>,
    /// Noise estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<NoiseSummary>,
}

impl AnalysisReport {
    /// Returns `true` if no analysis was run.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.histogram.is_none()
            && self.exposure.is_none()
            && self.color.is_none()
            && self.noise.is_none()
    }
}

/// Run every analysis in `kinds` on `image`. Duplicates are harmless.
#[must_use]
pub fn analyze(image: &RgbImage, kinds: &[AnalysisKind]) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    for kind in kinds {
        match kind {
            AnalysisKind::Histogram => report.histogram = Some(histogram(image)),
            AnalysisKind::Exposure => report.exposure = Some(exposure(image)),
            AnalysisKind::Color => report.color = Some(color_cast(image)),
            AnalysisKind::Noise => report.noise = Some(noise(image)),
        }
    }
    report
}

/// Per-channel distribution summary and clipping fractions.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn histogram(image: &RgbImage) -> HistogramSummary {
    let total = Dimensions::of(image).pixel_count();
    let hists = white_balance::channel_histograms(image);
    let means = white_balance::channel_means(image);

    let channels = std::array::from_fn(|c| {
        let hist = &hists[c];
        let min = hist.iter().position(|&n| n > 0).unwrap_or(0);
        let max = hist.iter().rposition(|&n| n > 0).unwrap_or(0);
        ChannelSummary {
            mean: means[c],
            median: white_balance::percentile(hist, total, 50.0),
            min: u8::try_from(min).unwrap_or(0),
            max: u8::try_from(max).unwrap_or(u8::MAX),
        }
    });

    let (black, white) = image.pixels().fold((0u64, 0u64), |(b, w), p| {
        (
            b + u64::from(p.0 == [0, 0, 0]),
            w + u64::from(p.0 == [255, 255, 255]),
        )
    });
    let fraction = |n: u64| if total == 0 { 0.0 } else { n as f64 / total as f64 };

    HistogramSummary {
        total_pixels: total,
        channels,
        clipped_shadows: fraction(black),
        clipped_highlights: fraction(white),
    }
}

/// Classify mean brightness.
#[must_use]
pub fn exposure(image: &RgbImage) -> ExposureSummary {
    let gray = color::grayscale(image);
    let (mean_brightness, _) = stats::mean_std(gray.pixels().map(|p| f64::from(p.0[0])));
    let status = if mean_brightness > OVEREXPOSED_BRIGHTNESS {
        Exposure::Overexposed
    } else if mean_brightness < UNDEREXPOSED_BRIGHTNESS {
        Exposure::Underexposed
    } else {
        Exposure::Normal
    };
    ExposureSummary {
        mean_brightness,
        status,
    }
}

/// Compare red and blue means.
#[must_use]
pub fn color_cast(image: &RgbImage) -> ColorSummary {
    let channel_means = white_balance::channel_means(image);
    let temperature = if channel_means[0] > channel_means[2] {
        ColorTemperature::Warm
    } else {
        ColorTemperature::Cool
    };
    ColorSummary {
        channel_means,
        temperature,
    }
}

/// Estimate noise from the Laplacian spread.
#[must_use]
pub fn noise(image: &RgbImage) -> NoiseSummary {
    let noise_level = stats::laplacian_std(&color::grayscale(image));
    NoiseSummary {
        noise_level,
        high_noise: noise_level > HIGH_NOISE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn only_requested_analyses_run() {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let report = analyze(&img, &[AnalysisKind::Color]);
        assert!(report.color.is_some());
        assert!(report.histogram.is_none() && report.exposure.is_none() && report.noise.is_none());
        assert!(analyze(&img, &[]).is_empty());
    }

    #[test]
    fn histogram_summary() {
        let img = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => Rgb([0, 0, 0]),
            1 => Rgb([255, 255, 255]),
            2 => Rgb([10, 20, 30]),
            _ => Rgb([30, 40, 50]),
        });
        let h = histogram(&img);
        assert_eq!(h.total_pixels, 4);
        assert!((h.clipped_shadows - 0.25).abs() < 1e-12);
        assert!((h.clipped_highlights - 0.25).abs() < 1e-12);
        assert_eq!(h.channels[0].min, 0);
        assert_eq!(h.channels[0].max, 255);
        assert!((h.channels[0].median - 20.0).abs() < 1e-9);
        assert!((h.channels[1].mean - 78.75).abs() < 1e-9);
    }

    #[test]
    fn exposure_classes() {
        let status = |v: u8| exposure(&RgbImage::from_pixel(3, 3, Rgb([v, v, v]))).status;
        assert_eq!(status(230), Exposure::Overexposed);
        assert_eq!(status(20), Exposure::Underexposed);
        assert_eq!(status(128), Exposure::Normal);
        assert_eq!(status(200), Exposure::Normal);
        assert_eq!(status(50), Exposure::Normal);
    }

    #[test]
    fn warm_and_cool() {
        let warm = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let cool = RgbImage::from_pixel(2, 2, Rgb([50, 100, 200]));
        let neutral = RgbImage::from_pixel(2, 2, Rgb([90, 90, 90]));
        assert_eq!(color_cast(&warm).temperature, ColorTemperature::Warm);
        assert_eq!(color_cast(&cool).temperature, ColorTemperature::Cool);
        assert_eq!(color_cast(&neutral).temperature, ColorTemperature::Cool);
    }

    #[test]
    fn noise_flag() {
        let flat = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        assert!(!noise(&flat).high_noise);
        let checker = RgbImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert!(noise(&checker).high_noise);
    }

    #[test]
    fn empty_image_is_defined() {
        let img = RgbImage::new(0, 0);
        let report = analyze(&img, &AnalysisKind::ALL);
        let h = report.histogram.unwrap();
        assert_eq!(h.total_pixels, 0);
        assert!(h.clipped_shadows.abs() < f64::EPSILON);
        assert_eq!(report.exposure.unwrap().status, Exposure::Underexposed);
    }

    #[test]
    fn kinds_parse_from_tags_and_short_names() {
        assert_eq!(
            "noiseAnalysis".parse::<AnalysisKind>().unwrap(),
            AnalysisKind::Noise
        );
        assert_eq!(
            "histogram_analysis".parse::<AnalysisKind>().unwrap(),
            AnalysisKind::Histogram
        );
        assert_eq!("color".parse::<AnalysisKind>().unwrap(), AnalysisKind::Color);
        assert!("sharpness".parse::<AnalysisKind>().is_err());
        let json = serde_json::to_string(&AnalysisKind::Exposure).unwrap();
        assert_eq!(json, "\"exposureAnalysis\"");
    }

    #[test]
    fn report_omits_unrequested_fields() {
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let json = serde_json::to_value(analyze(&img, &[AnalysisKind::Noise])).unwrap();
        assert!(json.get("noise").is_some());
        assert!(json.get("histogram").is_none());
    }
}
