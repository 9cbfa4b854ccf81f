//! Batch report: counters, output list, errors and per-file records.

use std::path::PathBuf;
use std::time::Duration;

use retouch_pipeline::types::duration_serde;
use retouch_pipeline::{AnalysisReport, StageRecord};
use serde::{Deserialize, Serialize};

/// Terminal state of one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Corrected and written.
    Succeeded,
    /// Deliberately not processed (existing output, unsupported format).
    Skipped,
    /// Processing was attempted and failed.
    Failed,
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// The input as given.
    pub input: PathBuf,
    /// Output path, when one was written or already existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Terminal state.
    pub status: FileStatus,
    /// Whether a container decode produced the raster that was corrected.
    pub converted: bool,
    /// Why the file was skipped or failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Stage records of the correction pass, empty if none ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageRecord>,
    /// Diagnostic analysis of the decoded input, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
}

impl FileRecord {
    pub(crate) fn new(input: PathBuf, status: FileStatus) -> Self {
        Self {
            input,
            output: None,
            status,
            converted: false,
            reason: None,
            stages: Vec::new(),
            analysis: None,
        }
    }

    /// Errors this file contributes to the batch error list.
    ///
    /// Failures and unsupported-format skips report their reason; an
    /// existing output is skipped silently. Succeeded files report
    /// stages that were skipped during correction.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        let name = self.input.display();
        match self.status {
            FileStatus::Failed => {
                vec![format!("{name}: {}", self.reason.as_deref().unwrap_or("failed"))]
            }
            FileStatus::Skipped if self.output.is_none() => self
                .reason
                .iter()
                .map(|reason| format!("{name}: {reason}"))
                .collect(),
            FileStatus::Skipped => Vec::new(),
            FileStatus::Succeeded => self
                .stages
                .iter()
                .filter_map(|record| match &record.outcome {
                    retouch_pipeline::StageOutcome::Applied => None,
                    retouch_pipeline::StageOutcome::Skipped { reason } => {
                        Some(format!("{name}: stage {} skipped: {reason}", record.stage))
                    }
                })
                .collect(),
        }
    }
}

/// The result of one batch job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Identifier of the job (32 hex digits).
    pub job_id: String,
    /// Number of inputs.
    pub total: usize,
    /// Files corrected and written.
    pub succeeded: usize,
    /// Container files decoded.
    pub converted: usize,
    /// Files that failed.
    pub failed: usize,
    /// Files skipped.
    pub skipped: usize,
    /// Outputs written, plus existing outputs that caused a skip.
    pub output_files: Vec<PathBuf>,
    /// Human-readable errors, in input order.
    pub errors: Vec<String>,
    /// Wall-clock time of the whole job (seconds).
    #[serde(rename = "elapsed_seconds", with = "duration_serde")]
    pub elapsed: Duration,
    /// One record per input, in input order.
    pub files: Vec<FileRecord>,
}

impl BatchReport {
    pub(crate) fn new(job_id: String, total: usize) -> Self {
        Self {
            job_id,
            total,
            ..Self::default()
        }
    }

    /// Fold one file's outcome into the counters.
    pub(crate) fn record(&mut self, file: FileRecord) {
        match file.status {
            FileStatus::Succeeded => self.succeeded += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed => self.failed += 1,
        }
        if file.converted {
            self.converted += 1;
        }
        if let Some(output) = &file.output {
            self.output_files.push(output.clone());
        }
        self.errors.extend(file.errors());
        self.files.push(file);
    }

    /// Returns `true` if every input either succeeded or was skipped.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use retouch_pipeline::{StageKind, StageOutcome};

    use super::*;

    fn record(status: FileStatus) -> FileRecord {
        FileRecord::new(PathBuf::from("in/x.png"), status)
    }

    #[test]
    fn counters_follow_statuses() {
        let mut report = BatchReport::new("id".into(), 4);
        let mut ok = record(FileStatus::Succeeded);
        ok.output = Some(PathBuf::from("out/x.jpg"));
        ok.converted = true;
        report.record(ok);

        let mut exists = record(FileStatus::Skipped);
        exists.output = Some(PathBuf::from("out/y.jpg"));
        exists.reason = Some("output already exists".into());
        report.record(exists);

        let mut unsupported = record(FileStatus::Skipped);
        unsupported.reason = Some("unsupported format: .xyz".into());
        report.record(unsupported);

        let mut broken = record(FileStatus::Failed);
        broken.reason = Some("decode failed".into());
        report.record(broken);

        assert_eq!(
            (report.succeeded, report.skipped, report.failed, report.converted),
            (1, 2, 1, 1)
        );
        assert_eq!(report.output_files.len(), 2);
        assert_eq!(
            report.errors,
            vec![
                "in/x.png: unsupported format: .xyz".to_owned(),
                "in/x.png: decode failed".to_owned(),
            ]
        );
        assert_eq!(report.files.len(), 4);
        assert!(!report.is_clean());
    }

    #[test]
    fn skipped_stages_are_reported_on_success() {
        let mut file = record(FileStatus::Succeeded);
        file.stages.push(StageRecord {
            stage: StageKind::Sharpening,
            duration: Duration::ZERO,
            outcome: StageOutcome::Skipped {
                reason: "image has no pixels (0x0)".into(),
            },
        });
        assert_eq!(
            file.errors(),
            vec!["in/x.png: stage sharpening skipped: image has no pixels (0x0)".to_owned()]
        );
    }

    #[test]
    fn report_serializes_elapsed_seconds() {
        let mut report = BatchReport::new("abc".into(), 0);
        report.elapsed = Duration::from_millis(250);
        let json = serde_json::to_value(&report).unwrap();
        assert!((json["elapsed_seconds"].as_f64().unwrap() - 0.25).abs() < 1e-9);
        assert_eq!(json["job_id"], "abc");
        let back: BatchReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
