//! Shared types for the retouch correction pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stage::StageKind;

/// Re-export `RgbImage` so downstream crates can hand images to the
/// pipeline without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB image.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Processing quality tier.
///
/// Two vocabularies exist for the same concept: `fast/medium/high` and
/// `fast/standard/professional`. Both parse into this one enum:
///
/// | input                    | tier       |
/// |--------------------------|------------|
/// | `fast`                   | `Fast`     |
/// | `standard`, `medium`     | `Standard` |
/// | `high`, `professional`   | `High`     |
///
/// The tier selects the default stage preset (see
/// [`preset_stages`](crate::pipeline::preset_stages)) and the sharpening
/// kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Lightest processing and the weakest sharpening kernel.
    Fast,
    /// Default preset without noise reduction or the second contrast pass.
    #[serde(alias = "medium")]
    Standard,
    /// Full preset: noise reduction first, second contrast pass last.
    #[default]
    #[serde(alias = "professional")]
    High,
}

impl QualityTier {
    /// All tiers, fastest first.
    pub const ALL: [Self; 3] = [Self::Fast, Self::Standard, Self::High];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "standard" | "medium" => Ok(Self::Standard),
            "high" | "professional" => Ok(Self::High),
            _ => Err(ParseTagError::new("quality tier", s)),
        }
    }
}

/// Stage selector configuration for one job.
///
/// When `stages` is `None` the tier preset decides which stages run.
/// When it is `Some`, exactly those stages run in exactly that order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrectionConfig {
    /// Quality tier.
    pub quality: QualityTier,
    /// Explicit ordered stage list, overriding the tier preset.
    pub stages: Option<Vec<StageKind>>,
}

impl CorrectionConfig {
    /// Config running the preset of the given tier.
    #[must_use]
    pub const fn preset(quality: QualityTier) -> Self {
        Self {
            quality,
            stages: None,
        }
    }

    /// Config running an explicit stage list.
    #[must_use]
    pub const fn named(quality: QualityTier, stages: Vec<StageKind>) -> Self {
        Self {
            quality,
            stages: Some(stages),
        }
    }

    /// The stages this config runs, in order.
    #[must_use]
    pub fn stage_plan(&self) -> Vec<StageKind> {
        self.stages
            .clone()
            .unwrap_or_else(|| crate::pipeline::preset_stages(self.quality))
    }
}

/// Errors raised by a single correction stage.
///
/// The sequencer never propagates these: the stage is skipped, the
/// pre-stage image is kept and the message is recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// The image has zero width or height.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Width of the rejected image.
        width: u32,
        /// Height of the rejected image.
        height: u32,
    },

    /// A stage produced an image of different dimensions than its input.
    #[error("stage changed dimensions from {before:?} to {after:?}")]
    DimensionMismatch {
        /// Input dimensions.
        before: Dimensions,
        /// Output dimensions.
        after: Dimensions,
    },
}

/// An unrecognized tag for one of the closed configuration enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseTagError {
    kind: &'static str,
    value: String,
}

impl ParseTagError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }

    /// The rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
pub mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Fails on negative, non-finite or out-of-range values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_of_image() {
        let img = RgbImage::new(17, 31);
        let dims = Dimensions::of(&img);
        assert_eq!(
            dims,
            Dimensions {
                width: 17,
                height: 31
            }
        );
        assert_eq!(dims.pixel_count(), 17 * 31);
        assert!(!dims.is_empty());
        assert!(Dimensions::of(&RgbImage::new(0, 5)).is_empty());
    }

    #[test]
    fn quality_vocabularies_are_reconciled() {
        assert_eq!("fast".parse::<QualityTier>().unwrap(), QualityTier::Fast);
        assert_eq!("medium".parse::<QualityTier>().unwrap(), QualityTier::Standard);
        assert_eq!("standard".parse::<QualityTier>().unwrap(), QualityTier::Standard);
        assert_eq!("high".parse::<QualityTier>().unwrap(), QualityTier::High);
        assert_eq!("Professional".parse::<QualityTier>().unwrap(), QualityTier::High);
    }

    #[test]
    fn unknown_quality_is_rejected() {
        let err = "ultra".parse::<QualityTier>().unwrap_err();
        assert_eq!(err.value(), "ultra");
        assert_eq!(err.to_string(), "unknown quality tier `ultra`");
    }

    #[test]
    fn quality_serde_accepts_aliases() {
        let tier: QualityTier = serde_json::from_str("\"professional\"").unwrap();
        assert_eq!(tier, QualityTier::High);
        let tier: QualityTier = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(tier, QualityTier::Standard);
        assert_eq!(serde_json::to_string(&QualityTier::High).unwrap(), "\"high\"");
    }

    #[test]
    fn default_config_uses_high_preset() {
        let config = CorrectionConfig::default();
        assert_eq!(config.quality, QualityTier::High);
        assert!(config.stages.is_none());
        assert_eq!(
            config.stage_plan(),
            crate::pipeline::preset_stages(QualityTier::High)
        );
    }

    #[test]
    fn config_rejects_unknown_stage_tag() {
        let json = r#"{"quality":"standard","stages":["whiteBalance","sparkle"]}"#;
        assert!(serde_json::from_str::<CorrectionConfig>(json).is_err());
    }

    #[test]
    fn config_rejects_unknown_field() {
        let json = r#"{"quality":"fast","corrections":[]}"#;
        assert!(serde_json::from_str::<CorrectionConfig>(json).is_err());
    }

    #[test]
    fn config_named_list_round_trips() {
        let config = CorrectionConfig::named(
            QualityTier::Standard,
            vec![StageKind::Sharpening, StageKind::WhiteBalance],
        );
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"sharpening\""));
        let back: CorrectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn stage_error_display() {
        let err = StageError::EmptyImage {
            width: 0,
            height: 4,
        };
        assert_eq!(err.to_string(), "image has no pixels (0x4)");
    }
}
