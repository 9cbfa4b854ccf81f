//! retouch-pipeline: adaptive photo correction (sans-IO).
//!
//! Measures an image, derives correction parameters from the
//! measurements with a fixed threshold policy, then runs an ordered list
//! of correction stages:
//! statistics -> policy -> white balance / contrast / tone / saturation /
//! smoothing / sharpening.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! [`RgbImage`]s. Decoding, encoding and the batch job live in
//! `retouch-io`.

pub mod analysis;
pub mod bilateral;
pub mod clahe;
pub mod color;
pub mod pipeline;
pub mod policy;
pub mod saturation;
pub mod sharpen;
pub mod stage;
pub mod stats;
pub mod tone;
pub mod types;
pub mod white_balance;

pub use analysis::{AnalysisKind, AnalysisReport, analyze};
pub use pipeline::{Corrected, StageOutcome, StageRecord, apply, preset_stages};
pub use policy::CorrectionParameters;
pub use stage::{CorrectionStage, StageContext, StageKind};
pub use stats::SignalStatistics;
pub use types::{
    CorrectionConfig, Dimensions, ParseTagError, QualityTier, RgbImage, StageError,
};
