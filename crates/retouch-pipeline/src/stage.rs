//! Correction stage selection and dispatch.
//!
//! [`StageKind`] is the closed set of named stages a job can request.
//! It implements [`CorrectionStage`], dispatching to the transform
//! modules with the per-image [`CorrectionParameters`] carried in a
//! [`StageContext`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bilateral::{self, BilateralParams};
use crate::policy::CorrectionParameters;
use crate::types::{Dimensions, ParseTagError, QualityTier, RgbImage, StageError};
use crate::{clahe, saturation, sharpen, tone, white_balance};

/// A named correction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    /// White-patch balance alone.
    WhitePatch,
    /// Gray-world balance alone.
    GrayWorld,
    /// Policy-weighted blend of gray-world and white-patch.
    WhiteBalance,
    /// CLAHE on lightness.
    ContrastEnhancement,
    /// Global min/max range stretch.
    ExposureCorrection,
    /// Gamma 0.7 shadow lift.
    ToneMapping,
    /// Policy saturation multiplier.
    SaturationControl,
    /// Policy-selected bilateral smoothing.
    NoiseReduction,
    /// Tier-selected 3x3 sharpening.
    Sharpening,
    /// Strong bilateral smoothing regardless of noise level.
    DetailEnhancement,
    /// Gamma 0.8 followed by a fixed saturation boost.
    ColorGrading,
}

impl StageKind {
    /// Every stage, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::WhitePatch,
        Self::GrayWorld,
        Self::WhiteBalance,
        Self::ContrastEnhancement,
        Self::ExposureCorrection,
        Self::ToneMapping,
        Self::SaturationControl,
        Self::NoiseReduction,
        Self::Sharpening,
        Self::DetailEnhancement,
        Self::ColorGrading,
    ];

    /// The configuration tag of this stage.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::WhitePatch => "whitePatch",
            Self::GrayWorld => "grayWorld",
            Self::WhiteBalance => "whiteBalance",
            Self::ContrastEnhancement => "contrastEnhancement",
            Self::ExposureCorrection => "exposureCorrection",
            Self::ToneMapping => "toneMapping",
            Self::SaturationControl => "saturationControl",
            Self::NoiseReduction => "noiseReduction",
            Self::Sharpening => "sharpening",
            Self::DetailEnhancement => "detailEnhancement",
            Self::ColorGrading => "colorGrading",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StageKind {
    type Err = ParseTagError;

    /// Parses a stage tag. Matching ignores ASCII case and accepts
    /// `snake_case` spellings (`white_balance`) as well as the camelCase
    /// tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|&c| c != '_' && c != '-')
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ParseTagError::new("correction stage", s))
    }
}

/// Per-image inputs shared by every stage of one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageContext {
    /// Parameters derived from the input image's statistics.
    pub parameters: CorrectionParameters,
    /// Tier of the job, used for kernel selection.
    pub quality: QualityTier,
}

/// Trait for correction stages.
///
/// Input and output have identical dimensions; implementations return
/// [`StageError`] instead of producing a differently-shaped image.
pub trait CorrectionStage {
    /// Transform `image` with the given per-image context.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::EmptyImage`] for an image with no pixels and
    /// [`StageError::DimensionMismatch`] if the transform reshaped it.
    fn apply(&self, image: &RgbImage, ctx: &StageContext) -> Result<RgbImage, StageError>;
}

impl CorrectionStage for StageKind {
    fn apply(&self, image: &RgbImage, ctx: &StageContext) -> Result<RgbImage, StageError> {
        let before = Dimensions::of(image);
        if before.is_empty() {
            return Err(StageError::EmptyImage {
                width: before.width,
                height: before.height,
            });
        }

        let params = &ctx.parameters;
        let out = match *self {
            Self::WhitePatch => white_balance::white_patch(image),
            Self::GrayWorld => white_balance::gray_world(image),
            Self::WhiteBalance => white_balance::blended(image, params.white_balance),
            Self::ContrastEnhancement => clahe::equalize_luminance(image, params.contrast),
            Self::ExposureCorrection => tone::stretch(image),
            Self::ToneMapping => tone::gamma(image, tone::TONE_MAPPING_GAMMA),
            Self::SaturationControl => {
                saturation::adjust_saturation(image, params.saturation_factor)
            }
            Self::NoiseReduction => match params.noise_reduction.filter() {
                Some(filter) => bilateral::bilateral_filter(image, filter),
                None => image.clone(),
            },
            Self::Sharpening => sharpen::sharpen(image, ctx.quality),
            Self::DetailEnhancement => {
                bilateral::bilateral_filter(image, BilateralParams::STRONG)
            }
            Self::ColorGrading => saturation::color_grade(image),
        };

        let after = Dimensions::of(&out);
        if after != before {
            return Err(StageError::DimensionMismatch { before, after });
        }
        Ok(out)
    }
}
