//! Container decoding boundary (HEIC/HEIF).
//!
//! Container files are converted into a JPEG intermediate inside the
//! job workspace before correction. [`ExternalCommandDecoder`] delegates
//! to the libheif `heif-convert` tool; any failure to launch it, a
//! non-zero exit or a missing output counts as a decode failure.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// JPEG quality of decoded intermediates.
pub const DEFAULT_CONTAINER_QUALITY: u8 = 95;

/// Errors raised while decoding a container file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The decoder program could not be started.
    #[error("failed to launch {}: {source}", program.to_string_lossy())]
    Launch {
        /// Program that was invoked.
        program: OsString,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The decoder ran but reported failure.
    #[error("failed to decode {}: {reason}", input.display())]
    Failed {
        /// Container file that failed.
        input: PathBuf,
        /// Exit status and diagnostic output.
        reason: String,
    },

    /// The decoder claimed success but produced no file.
    #[error("decoder produced no output at {}", output.display())]
    MissingOutput {
        /// Expected intermediate path.
        output: PathBuf,
    },
}

/// Converts a container file into a raster file.
pub trait ContainerDecoder {
    /// Decode `input` and write a JPEG raster to `output` at `quality`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if decoding fails; `output` may then be
    /// absent or incomplete.
    fn decode(&self, input: &Path, output: &Path, quality: u8) -> Result<(), DecodeError>;
}

/// [`ContainerDecoder`] that runs an external converter as
/// `<program> -q <quality> <input> <output>`.
#[derive(Debug, Clone)]
pub struct ExternalCommandDecoder {
    program: OsString,
}

impl ExternalCommandDecoder {
    /// Program used by [`Default`].
    pub const DEFAULT_PROGRAM: &'static str = "heif-convert";

    /// Use `program` instead of `heif-convert`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program this decoder invokes.
    #[must_use]
    pub fn program(&self) -> &OsString {
        &self.program
    }
}

impl Default for ExternalCommandDecoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl ContainerDecoder for ExternalCommandDecoder {
    fn decode(&self, input: &Path, output: &Path, quality: u8) -> Result<(), DecodeError> {
        let result = Command::new(&self.program)
            .arg("-q")
            .arg(quality.clamp(1, 100).to_string())
            .arg(input)
            .arg(output)
            .output()
            .map_err(|source| DecodeError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(DecodeError::Failed {
                input: input.to_path_buf(),
                reason: format!("{} {}", result.status, stderr.trim()).trim().to_owned(),
            });
        }
        if !output.is_file() {
            return Err(DecodeError::MissingOutput {
                output: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_program_is_heif_convert() {
        assert_eq!(
            ExternalCommandDecoder::default().program(),
            &OsString::from("heif-convert")
        );
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let decoder = ExternalCommandDecoder::new("retouch-test-no-such-decoder");
        let dir = tempfile::tempdir().unwrap();
        let err = decoder
            .decode(&dir.path().join("a.heic"), &dir.path().join("a.jpg"), 95)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Launch { .. }), "{err}");
        assert!(err.to_string().contains("retouch-test-no-such-decoder"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_a_decode_failure() {
        let decoder = ExternalCommandDecoder::new("false");
        let dir = tempfile::tempdir().unwrap();
        let err = decoder
            .decode(&dir.path().join("a.heic"), &dir.path().join("a.jpg"), 95)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Failed { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn success_without_output_is_missing_output() {
        let decoder = ExternalCommandDecoder::new("true");
        let dir = tempfile::tempdir().unwrap();
        let err = decoder
            .decode(&dir.path().join("a.heic"), &dir.path().join("a.jpg"), 95)
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingOutput { .. }), "{err}");
    }
}
