//! The correction sequencer.
//!
//! [`apply`] measures the input once, derives the parameters once and
//! then folds the stage plan over the image. A failing stage never
//! aborts the pass: the image from before that stage is carried forward
//! and the failure is recorded in the returned [`StageRecord`] list.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::policy::{self, CorrectionParameters};
use crate::stage::{CorrectionStage, StageContext, StageKind};
use crate::stats::{self, SignalStatistics};
use crate::types::{CorrectionConfig, QualityTier, RgbImage, duration_serde};

/// The default stage list of a quality tier.
///
/// | tier       | stages |
/// |------------|--------|
/// | `Fast`     | white balance, contrast, exposure, saturation |
/// | `Standard` | white balance, contrast, exposure, saturation |
/// | `High`     | noise reduction, white balance, contrast, exposure, saturation, contrast |
///
/// The tiers differ beyond this list through the sharpening kernel,
/// which applies whenever a named list includes [`StageKind::Sharpening`].
#[must_use]
pub fn preset_stages(quality: QualityTier) -> Vec<StageKind> {
    let core = [
        StageKind::WhiteBalance,
        StageKind::ContrastEnhancement,
        StageKind::ExposureCorrection,
        StageKind::SaturationControl,
    ];
    match quality {
        QualityTier::Fast | QualityTier::Standard => core.to_vec(),
        QualityTier::High => std::iter::once(StageKind::NoiseReduction)
            .chain(core)
            .chain(std::iter::once(StageKind::ContrastEnhancement))
            .collect(),
    }
}

/// What happened to one planned stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    /// The stage's output replaced the working image.
    Applied,
    /// The stage failed and the working image was passed through.
    Skipped {
        /// Display form of the stage error.
        reason: String,
    },
}

/// Timing and outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage that ran.
    pub stage: StageKind,
    /// Wall-clock time spent in the stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Whether the stage's output was kept.
    pub outcome: StageOutcome,
}

/// The result of one correction pass.
#[derive(Debug, Clone)]
pub struct Corrected {
    /// The corrected image, same dimensions as the input.
    pub image: RgbImage,
    /// Statistics of the input image.
    pub statistics: SignalStatistics,
    /// Parameters every stage of this pass used.
    pub parameters: CorrectionParameters,
    /// One record per planned stage, in execution order.
    pub stages: Vec<StageRecord>,
}

impl Corrected {
    /// `"<stage>: <reason>"` for every stage that was skipped.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.stages
            .iter()
            .filter_map(|record| match &record.outcome {
                StageOutcome::Applied => None,
                StageOutcome::Skipped { reason } => Some(format!("{}: {reason}", record.stage)),
            })
            .collect()
    }

    /// Total time spent across all stages.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|r| r.duration).sum()
    }

    /// Human-readable multi-line summary of the pass.
    #[must_use]
    pub fn report(&self) -> String {
        let s = &self.statistics;
        let mut out = format!(
            "brightness {:.1}, contrast {:.1}, saturation {:.1}\u{b1}{:.1}, noise {:.1}\n",
            s.brightness, s.contrast, s.saturation_mean, s.saturation_std, s.noise,
        );
        for record in &self.stages {
            let ms = record.duration.as_secs_f64() * 1000.0;
            let _ = match &record.outcome {
                StageOutcome::Applied => writeln!(out, "  {:<20} {ms:>9.3}ms", record.stage.tag()),
                StageOutcome::Skipped { reason } => writeln!(
                    out,
                    "  {:<20} {ms:>9.3}ms  skipped: {reason}",
                    record.stage.tag()
                ),
            };
        }
        out
    }
}

/// Run one correction pass over `image`.
///
/// Statistics and parameters come from the input image and are reused
/// by every stage, including repeated ones.
#[must_use]
pub fn apply(image: &RgbImage, config: &CorrectionConfig) -> Corrected {
    let statistics = stats::compute(image);
    let parameters = policy::derive(&statistics);
    let ctx = StageContext {
        parameters,
        quality: config.quality,
    };

    let plan = config.stage_plan();
    let mut stages = Vec::with_capacity(plan.len());
    let mut current = image.clone();

    for stage in plan {
        let start = Instant::now();
        let outcome = match stage.apply(&current, &ctx) {
            Ok(next) => {
                current = next;
                StageOutcome::Applied
            }
            Err(e) => StageOutcome::Skipped {
                reason: e.to_string(),
            },
        };
        stages.push(StageRecord {
            stage,
            duration: start.elapsed(),
            outcome,
        });
    }

    Corrected {
        image: current,
        statistics,
        parameters,
        stages,
    }
}
