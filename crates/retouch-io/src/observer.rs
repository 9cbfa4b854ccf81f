//! Job progress observation.
//!
//! The batch processor reports through an injected [`JobObserver`]
//! instead of a process-wide logger. [`TracingObserver`] forwards events
//! to `tracing`; [`SilentObserver`] drops them.

use std::io;
use std::path::Path;

use retouch_pipeline::Corrected;

use crate::report::{BatchReport, FileRecord, FileStatus};

/// Receives job lifecycle events. Every method defaults to a no-op.
pub trait JobObserver {
    /// Pre-flight passed and per-file work is about to start. `workspace`
    /// is `None` when the job has no container input to decode.
    fn job_started(&self, _job_id: &str, _total: usize, _workspace: Option<&Path>) {}

    /// The correction pass over `input` finished; the output is not
    /// written yet.
    fn file_corrected(&self, _input: &Path, _corrected: &Corrected) {}

    /// One input reached its terminal state.
    fn file_finished(&self, _record: &FileRecord) {}

    /// The workspace could not be removed. The job still completes.
    fn cleanup_failed(&self, _workspace: &Path, _error: &io::Error) {}

    /// The job is complete.
    fn job_finished(&self, _report: &BatchReport) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl JobObserver for SilentObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn job_started(&self, job_id: &str, total: usize, workspace: Option<&Path>) {
        tracing::info!(job_id, total, workspace = ?workspace, "job started");
    }

    fn file_corrected(&self, input: &Path, corrected: &Corrected) {
        tracing::debug!(
            input = %input.display(),
            elapsed = corrected.total_duration().as_secs_f64(),
            "correction pass\n{}",
            corrected.report()
        );
    }

    fn file_finished(&self, record: &FileRecord) {
        let input = record.input.display();
        let reason = record.reason.as_deref().unwrap_or("");
        match record.status {
            FileStatus::Succeeded => {
                tracing::info!(%input, converted = record.converted, "corrected");
                for error in record.errors() {
                    tracing::warn!("{error}");
                }
            }
            FileStatus::Skipped => tracing::info!(%input, reason, "skipped"),
            FileStatus::Failed => tracing::error!(%input, reason, "failed"),
        }
    }

    fn cleanup_failed(&self, workspace: &Path, error: &io::Error) {
        tracing::warn!(workspace = %workspace.display(), %error, "could not remove job workspace");
    }

    fn job_finished(&self, report: &BatchReport) {
        tracing::info!(
            job_id = %report.job_id,
            succeeded = report.succeeded,
            total = report.total,
            failed = report.failed,
            skipped = report.skipped,
            elapsed = report.elapsed.as_secs_f64(),
            "job finished"
        );
    }
}
