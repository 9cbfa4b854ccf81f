//! Batch job orchestration.
//!
//! [`BatchProcessor::run`] drives every input through
//! `pending -> {skipped | converted -> corrected -> written | failed}`,
//! accumulating a [`BatchReport`]. Setup problems (no inputs, unusable
//! output directory, no workspace for container inputs) are returned as
//! [`JobError`] before any file is touched; after that the report is
//! always returned and per-file problems only show up inside it.
//!
//! A job that has container inputs to decode owns a private workspace
//! directory for the intermediates; other jobs never touch the
//! workspace root. The workspace is removed when `run` returns,
//! including on unwind; a removal failure goes to the observer and is
//! otherwise ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use retouch_pipeline::{AnalysisKind, Corrected, CorrectionConfig, analyze};
use serde::{Deserialize, Serialize};
use siphasher::sip128::{Hasher128, SipHasher13};

use crate::codec::{self, CodecError, DEFAULT_JPEG_QUALITY, ImageCodec, RasterCodec};
use crate::container::{ContainerDecoder, DEFAULT_CONTAINER_QUALITY, ExternalCommandDecoder};
use crate::formats::{InputKind, OUTPUT_EXTENSION, lowercase_extension};
use crate::observer::{JobObserver, TracingObserver};
use crate::report::{BatchReport, FileRecord, FileStatus};

/// Everything a job needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Quality tier and stage selection.
    pub correction: CorrectionConfig,
    /// Decode container inputs; when off they are skipped.
    pub convert_container: bool,
    /// Diagnostic analyses to attach to each file record.
    pub analysis: Vec<AnalysisKind>,
    /// JPEG quality of corrected outputs.
    pub output_quality: u8,
    /// JPEG quality of decoded container intermediates.
    pub container_quality: u8,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            correction: CorrectionConfig::default(),
            convert_container: true,
            analysis: Vec::new(),
            output_quality: DEFAULT_JPEG_QUALITY,
            container_quality: DEFAULT_CONTAINER_QUALITY,
        }
    }
}

/// Errors that stop a job before per-file processing starts.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The input list is empty.
    #[error("no input files")]
    NoInputs,

    /// The input directory does not exist or is not a directory.
    #[error("input directory not found: {}", path.display())]
    InputDirNotFound {
        /// The missing directory.
        path: PathBuf,
    },

    /// Walking the input directory failed.
    #[error("failed to scan input directory: {0}")]
    Scan(#[from] walkdir::Error),

    /// The input directory holds no supported files.
    #[error("no supported images found in {}", path.display())]
    NoSupportedInputs {
        /// The scanned directory.
        path: PathBuf,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        /// Requested output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The job workspace could not be created.
    #[error("cannot create job workspace under {}: {source}", root.display())]
    Workspace {
        /// Workspace root directory.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Runs batch jobs with a fixed set of collaborators.
#[derive(Debug)]
pub struct BatchProcessor<C = ImageCodec, D = ExternalCommandDecoder, O = TracingObserver> {
    codec: C,
    decoder: D,
    observer: O,
    workspace_root: PathBuf,
}

impl BatchProcessor {
    /// The `image` codec, `heif-convert` and `tracing`, with workspaces
    /// under `workspace_root`.
    #[must_use]
    pub fn with_defaults(workspace_root: impl Into<PathBuf>) -> Self {
        Self::new(
            ImageCodec,
            ExternalCommandDecoder::default(),
            TracingObserver,
            workspace_root,
        )
    }
}

impl<C: RasterCodec, D: ContainerDecoder, O: JobObserver> BatchProcessor<C, D, O> {
    /// Assemble a processor. Job workspaces are created under
    /// `workspace_root`, which is created on demand.
    pub fn new(codec: C, decoder: D, observer: O, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            codec,
            decoder,
            observer,
            workspace_root: workspace_root.into(),
        }
    }

    /// The observer receiving this processor's events.
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// The container decoder.
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Process `inputs` in order, writing `<stem>.jpg` files into
    /// `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NoInputs`] for an empty list,
    /// [`JobError::OutputDir`] if `output_dir` cannot be created and
    /// [`JobError::Workspace`] if container inputs need decoding and the
    /// job workspace cannot be created.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        config: &JobConfig,
    ) -> Result<BatchReport, JobError> {
        let start = Instant::now();
        if inputs.is_empty() {
            return Err(JobError::NoInputs);
        }
        fs::create_dir_all(output_dir).map_err(|source| JobError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let job_id = new_job_id();
        let needs_workspace = config.convert_container
            && inputs
                .iter()
                .any(|input| InputKind::of(input) == InputKind::Container);
        let workspace = needs_workspace
            .then(|| self.create_workspace(&job_id))
            .transpose()?;
        let workspace_path = workspace.as_ref().map(|dir| dir.path().to_path_buf());
        self.observer
            .job_started(&job_id, inputs.len(), workspace_path.as_deref());

        let mut report = BatchReport::new(job_id, inputs.len());
        for input in inputs {
            let record = self.process_file(input, output_dir, workspace_path.as_deref(), config);
            self.observer.file_finished(&record);
            report.record(record);
        }

        if let Some(workspace) = workspace {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                self.observer.cleanup_failed(&path, &e);
            }
        }

        report.elapsed = start.elapsed();
        self.observer.job_finished(&report);
        Ok(report)
    }

    fn create_workspace(&self, job_id: &str) -> Result<tempfile::TempDir, JobError> {
        let workspace_err = |source| JobError::Workspace {
            root: self.workspace_root.clone(),
            source,
        };
        fs::create_dir_all(&self.workspace_root).map_err(workspace_err)?;
        tempfile::Builder::new()
            .prefix(&format!("job_{job_id}_"))
            .tempdir_in(&self.workspace_root)
            .map_err(workspace_err)
    }

    fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
        workspace: Option<&Path>,
        config: &JobConfig,
    ) -> FileRecord {
        let mut record = FileRecord::new(input.to_path_buf(), FileStatus::Failed);

        if !input.is_file() {
            record.reason = Some("input not found".to_owned());
            return record;
        }
        let (Some(stem), Some(file_name)) = (input.file_stem(), input.file_name()) else {
            record.reason = Some("input has no file name".to_owned());
            return record;
        };

        let mut output_name = stem.to_os_string();
        output_name.push(".");
        output_name.push(OUTPUT_EXTENSION);
        let output = output_dir.join(output_name);
        if output.exists() {
            record.status = FileStatus::Skipped;
            record.reason = Some("output already exists".to_owned());
            record.output = Some(output);
            return record;
        }

        let source = match InputKind::of(input) {
            InputKind::Raster => input.to_path_buf(),
            InputKind::Container if config.convert_container => {
                let Some(workspace) = workspace else {
                    record.reason = Some("no job workspace for container decoding".to_owned());
                    return record;
                };
                let mut temp_name = std::ffi::OsString::from("temp_");
                temp_name.push(file_name);
                temp_name.push(".jpg");
                let intermediate = workspace.join(temp_name);
                if let Err(e) =
                    self.decoder
                        .decode(input, &intermediate, config.container_quality)
                {
                    record.reason = Some(e.to_string());
                    return record;
                }
                record.converted = true;
                intermediate
            }
            InputKind::Container => {
                record.status = FileStatus::Skipped;
                record.reason = Some(format!(
                    "container conversion disabled: {}",
                    dotted_extension(input)
                ));
                return record;
            }
            InputKind::Unsupported => {
                record.status = FileStatus::Skipped;
                record.reason = Some(format!("unsupported format: {}", dotted_extension(input)));
                return record;
            }
        };

        let image = match self.codec.read(&source) {
            Ok(image) => image,
            Err(e) => {
                record.reason = Some(e.to_string());
                return record;
            }
        };

        if !config.analysis.is_empty() {
            record.analysis = Some(analyze(&image, &config.analysis));
        }

        let corrected = retouch_pipeline::apply(&image, &config.correction);
        self.observer.file_corrected(input, &corrected);
        let Corrected {
            image: corrected, stages, ..
        } = corrected;
        record.stages = stages;

        match codec::write_new(&self.codec, &corrected, config.output_quality, &output) {
            Ok(()) => {
                record.status = FileStatus::Succeeded;
                record.output = Some(output);
            }
            Err(CodecError::OutputExists { path }) => {
                record.status = FileStatus::Skipped;
                record.reason = Some("output already exists".to_owned());
                record.output = Some(path);
            }
            Err(e) => record.reason = Some(e.to_string()),
        }
        record
    }
}

/// `.ext` of `path`, lowercased, or `(none)`.
fn dotted_extension(path: &Path) -> String {
    lowercase_extension(path).map_or_else(|| "(none)".to_owned(), |ext| format!(".{ext}"))
}

/// A fresh 128-bit job identifier as 32 lowercase hex digits.
///
/// Hashes the wall clock, the process id and a per-process counter, so
/// ids differ across calls within one process and across processes.
#[must_use]
pub fn new_job_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let mut hasher = SipHasher13::new();
    std::hash::Hash::hash(&nanos, &mut hasher);
    std::hash::Hash::hash(&process::id(), &mut hasher);
    std::hash::Hash::hash(&COUNTER.fetch_add(1, Ordering::Relaxed), &mut hasher);
    format!("{:032x}", hasher.finish128().as_u128())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_hex() {
        let a = new_job_id();
        let b = new_job_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn default_config() {
        let config = JobConfig::default();
        assert!(config.convert_container);
        assert_eq!(config.output_quality, 95);
        assert_eq!(config.container_quality, 95);
        assert!(config.analysis.is_empty());
        assert!(config.correction.stages.is_none());
    }

    #[test]
    fn config_from_partial_json() {
        let json = r#"{
            "correction": {"quality": "professional", "stages": ["toneMapping"]},
            "convert_container": false,
            "analysis": ["noiseAnalysis"]
        }"#;
        let config: JobConfig = serde_json::from_str(json).unwrap();
        assert!(!config.convert_container);
        assert_eq!(config.output_quality, 95);
        assert_eq!(config.analysis, vec![AnalysisKind::Noise]);
        assert_eq!(
            config.correction.quality,
            retouch_pipeline::QualityTier::High
        );
    }

    #[test]
    fn config_rejects_unknown_fields() {
        assert!(serde_json::from_str::<JobConfig>(r#"{"convert_heic": true}"#).is_err());
    }

    #[test]
    fn dotted_extension_lowercases() {
        assert_eq!(dotted_extension(Path::new("a.XYZ")), ".xyz");
        assert_eq!(dotted_extension(Path::new("README")), "(none)");
    }
}
