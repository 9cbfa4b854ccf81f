//! Parameter policy: fixed threshold rules mapping [`SignalStatistics`]
//! to correction parameters.
//!
//! All comparisons are strict, so a statistic sitting exactly on a
//! cutoff falls into the middle ("normal") branch. Brightness 100 is not
//! dark and brightness 200 is not bright.
//!
//! | family          | condition                 | result                    |
//! |-----------------|---------------------------|---------------------------|
//! | white balance   | brightness < 100          | gray-world 0.8 / patch 0.2 |
//! |                 | brightness > 200          | gray-world 0.3 / patch 0.7 |
//! |                 | otherwise                 | gray-world 0.7 / patch 0.3 |
//! | local contrast  | contrast < 30             | clip 2.0, 8x8 tiles       |
//! |                 | contrast > 80             | clip 1.2, 12x12 tiles     |
//! |                 | otherwise                 | clip 1.5, 8x8 tiles       |
//! | saturation      | mean < 50                 | x1.4                      |
//! |                 | mean > 180                | x0.8                      |
//! |                 | std > 60                  | x1.1                      |
//! |                 | otherwise                 | x1.0                      |
//! | noise reduction | noise > 50                | strong                    |
//! |                 | noise > 25                | moderate                  |
//! |                 | otherwise                 | off                       |

use serde::{Deserialize, Serialize};

use crate::bilateral::BilateralParams;
use crate::stats::SignalStatistics;

/// Brightness below which an image counts as dark.
pub const DARK_BRIGHTNESS: f64 = 100.0;
/// Brightness above which an image counts as bright.
pub const BRIGHT_BRIGHTNESS: f64 = 200.0;
/// Contrast below which an image counts as flat.
pub const LOW_CONTRAST: f64 = 30.0;
/// Contrast above which an image counts as contrasty.
pub const HIGH_CONTRAST: f64 = 80.0;
/// Mean saturation below which an image counts as washed out.
pub const LOW_SATURATION: f64 = 50.0;
/// Mean saturation above which an image counts as oversaturated.
pub const HIGH_SATURATION: f64 = 180.0;
/// Saturation spread above which saturation is gently boosted.
pub const VARIABLE_SATURATION_STD: f64 = 60.0;
/// Noise estimate above which strong smoothing is applied.
pub const STRONG_NOISE: f64 = 50.0;
/// Noise estimate above which moderate smoothing is applied.
pub const MODERATE_NOISE: f64 = 25.0;

/// Weights for mixing gray-world and white-patch balanced images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalanceBlend {
    /// Weight of the gray-world result.
    pub gray_world: f32,
    /// Weight of the white-patch result.
    pub white_patch: f32,
}

/// Contrast-limited adaptive histogram equalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastParams {
    /// Histogram clip limit, relative to a uniform distribution.
    pub clip_limit: f32,
    /// Tile grid as `(columns, rows)`.
    pub tile_grid: (u32, u32),
}

/// Noise reduction strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseReduction {
    /// Pass the image through unchanged.
    #[default]
    Off,
    /// Small bilateral window.
    Moderate,
    /// Large bilateral window.
    Strong,
}

impl NoiseReduction {
    /// Bilateral filter settings, or `None` when smoothing is off.
    #[must_use]
    pub const fn filter(self) -> Option<BilateralParams> {
        match self {
            Self::Off => None,
            Self::Moderate => Some(BilateralParams::MODERATE),
            Self::Strong => Some(BilateralParams::STRONG),
        }
    }
}

/// Every parameter the correction stages need, derived for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionParameters {
    /// Blend weights for the combined white balance.
    pub white_balance: WhiteBalanceBlend,
    /// Local contrast equalization settings.
    pub contrast: ContrastParams,
    /// Saturation multiplier.
    pub saturation_factor: f32,
    /// Noise reduction strength.
    pub noise_reduction: NoiseReduction,
}

/// Derive all correction parameters from `stats`.
#[must_use]
pub fn derive(stats: &SignalStatistics) -> CorrectionParameters {
    CorrectionParameters {
        white_balance: white_balance_blend(stats.brightness),
        contrast: contrast_params(stats.contrast),
        saturation_factor: saturation_factor(stats.saturation_mean, stats.saturation_std),
        noise_reduction: noise_reduction(stats.noise),
    }
}

/// White balance blend weights for a given mean brightness.
#[must_use]
pub fn white_balance_blend(brightness: f64) -> WhiteBalanceBlend {
    let (gray_world, white_patch) = if brightness < DARK_BRIGHTNESS {
        (0.8, 0.2)
    } else if brightness > BRIGHT_BRIGHTNESS {
        (0.3, 0.7)
    } else {
        (0.7, 0.3)
    };
    WhiteBalanceBlend {
        gray_world,
        white_patch,
    }
}

/// CLAHE settings for a given contrast (grayscale standard deviation).
#[must_use]
pub fn contrast_params(contrast: f64) -> ContrastParams {
    if contrast < LOW_CONTRAST {
        ContrastParams {
            clip_limit: 2.0,
            tile_grid: (8, 8),
        }
    } else if contrast > HIGH_CONTRAST {
        ContrastParams {
            clip_limit: 1.2,
            tile_grid: (12, 12),
        }
    } else {
        ContrastParams {
            clip_limit: 1.5,
            tile_grid: (8, 8),
        }
    }
}

/// Saturation multiplier for a given saturation mean and spread.
#[must_use]
pub fn saturation_factor(mean: f64, std: f64) -> f32 {
    if mean < LOW_SATURATION {
        1.4
    } else if mean > HIGH_SATURATION {
        0.8
    } else if std > VARIABLE_SATURATION_STD {
        1.1
    } else {
        1.0
    }
}

/// Noise reduction strength for a given noise estimate.
#[must_use]
pub fn noise_reduction(noise: f64) -> NoiseReduction {
    if noise > STRONG_NOISE {
        NoiseReduction::Strong
    } else if noise > MODERATE_NOISE {
        NoiseReduction::Moderate
    } else {
        NoiseReduction::Off
    }
}
