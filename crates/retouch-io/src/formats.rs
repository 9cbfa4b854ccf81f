//! Input and output file format classification.

use std::path::Path;

use retouch_pipeline::QualityTier;
use serde::Serialize;

/// Raster extensions the codec reads directly.
pub const RASTER_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tiff", "bmp"];

/// Container extensions that need decoding into a raster first.
pub const CONTAINER_EXTENSIONS: [&str; 2] = ["heic", "heif"];

/// Extension of every corrected output.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// How an input path is handled, decided by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Read by the raster codec.
    Raster,
    /// Decoded by the container decoder.
    Container,
    /// Neither.
    Unsupported,
}

impl InputKind {
    /// Classify `path` by its extension, ignoring ASCII case.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let Some(ext) = lowercase_extension(path) else {
            return Self::Unsupported;
        };
        if RASTER_EXTENSIONS.contains(&ext.as_str()) {
            Self::Raster
        } else if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
            Self::Container
        } else {
            Self::Unsupported
        }
    }

    /// Returns `true` for raster and container inputs.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// The lowercased extension of `path`, without the dot.
#[must_use]
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Description of the formats a batch accepts and produces.
#[derive(Debug, Clone, Serialize)]
pub struct SupportedFormats {
    /// Raster input extensions, with leading dot.
    pub raster: Vec<String>,
    /// Container input extensions, with leading dot.
    pub container: Vec<String>,
    /// Output extension, with leading dot.
    pub output: String,
    /// Accepted quality tier names.
    pub quality_tiers: Vec<&'static str>,
}

impl SupportedFormats {
    /// The formats of this build.
    #[must_use]
    pub fn current() -> Self {
        let dotted = |exts: &[&str]| exts.iter().map(|e| format!(".{e}")).collect();
        Self {
            raster: dotted(&RASTER_EXTENSIONS),
            container: dotted(&CONTAINER_EXTENSIONS),
            output: format!(".{OUTPUT_EXTENSION}"),
            quality_tiers: QualityTier::ALL.iter().map(|q| q.as_str()).collect(),
        }
    }
}
