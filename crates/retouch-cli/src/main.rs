//! retouch: batch photo correction from the command line.
//!
//! Collects every supported image under an input directory, corrects
//! each one with the adaptive pipeline and writes `<stem>.jpg` files to
//! the output directory. The batch report is printed to stdout as JSON
//! and saved as `processing_result.json` next to the outputs. Failures
//! before processing print `{"success": false, "error": ...}` and exit
//! non-zero; with `--strict`, so does a batch in which any file failed.
//!
//! # Usage
//!
//! ```text
//! retouch [OPTIONS] <INPUT_DIR> <OUTPUT_DIR>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{SecondsFormat, Utc};
use clap::{Parser, ValueEnum};
use retouch_io::{BatchProcessor, BatchReport, JobConfig, SupportedFormats};
use retouch_pipeline::{AnalysisKind, CorrectionConfig, QualityTier, StageKind};
use serde::Serialize;

/// File name of the saved report inside the output directory.
const RESULT_FILE: &str = "processing_result.json";

/// Adaptive batch photo correction.
///
/// Measures each photo, derives white balance, contrast, saturation and
/// noise parameters from the measurements and applies an ordered list of
/// correction stages.
#[derive(Parser)]
#[command(name = "retouch", version)]
struct Cli {
    /// Directory to read images from.
    input_dir: PathBuf,

    /// Directory to write corrected JPEGs to (created if missing).
    output_dir: PathBuf,

    /// Processing quality tier.
    #[arg(long, value_enum, default_value_t = Quality::High)]
    quality: Quality,

    /// Explicit comma-separated stage list, run in the given order
    /// (e.g. `whiteBalance,sharpening`). Overrides the tier preset.
    #[arg(long, value_delimiter = ',', value_parser = parse_stage)]
    stages: Option<Vec<StageKind>>,

    /// Comma-separated diagnostic analyses to attach to each file
    /// (histogram, exposure, color, noise).
    #[arg(long, value_delimiter = ',', value_parser = parse_analysis)]
    analysis: Vec<AnalysisKind>,

    /// Skip HEIC/HEIF inputs instead of decoding them.
    #[arg(long)]
    no_convert_container: bool,

    /// Only scan the top level of the input directory.
    #[arg(long)]
    no_recursive: bool,

    /// JPEG quality of the corrected outputs.
    #[arg(long, default_value_t = retouch_io::codec::DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    output_quality: u8,

    /// Directory under which per-job workspaces are created.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Full job config as a JSON string.
    ///
    /// When provided, the quality, stage, analysis, conversion and output
    /// quality flags are ignored. The JSON must be a valid `JobConfig`.
    #[arg(long)]
    config_json: Option<String>,

    /// Validate the inputs and print the result without processing.
    #[arg(long)]
    dry_run: bool,

    /// Print the supported formats as JSON and exit.
    #[arg(long)]
    list_formats: bool,

    /// Exit non-zero when any input failed.
    #[arg(long)]
    strict: bool,

    /// Log the per-stage report of every corrected file (same as
    /// `--log-level debug`).
    #[arg(short, long)]
    verbose: bool,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Quality tier selection.
#[derive(Clone, Copy, ValueEnum)]
enum Quality {
    /// Lightest processing.
    Fast,
    /// Balanced preset.
    #[value(alias = "medium")]
    Standard,
    /// Full preset with noise reduction and a second contrast pass.
    #[value(alias = "professional")]
    High,
}

impl From<Quality> for QualityTier {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Fast => Self::Fast,
            Quality::Standard => Self::Standard,
            Quality::High => Self::High,
        }
    }
}

fn parse_stage(s: &str) -> Result<StageKind, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_analysis(s: &str) -> Result<AnalysisKind, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Build a [`JobConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual job flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<JobConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("error parsing --config-json: {e}"));
    }

    let quality = QualityTier::from(cli.quality);
    Ok(JobConfig {
        correction: match &cli.stages {
            Some(stages) => CorrectionConfig::named(quality, stages.clone()),
            None => CorrectionConfig::preset(quality),
        },
        convert_container: !cli.no_convert_container,
        analysis: cli.analysis.clone(),
        output_quality: cli.output_quality,
        ..JobConfig::default()
    })
}

/// The JSON printed once the job ran: the report plus a success flag and
/// RFC 3339 start and end times.
#[derive(Serialize)]
struct Success<'a> {
    success: bool,
    start_time: String,
    end_time: String,
    #[serde(flatten)]
    report: &'a BatchReport,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether the process should exit successfully after the job ran.
const fn job_succeeded(report: &BatchReport, strict: bool) -> bool {
    !strict || report.is_clean()
}

/// The JSON printed when the job cannot run.
#[derive(Serialize)]
struct Failure<'a> {
    success: bool,
    error: &'a str,
}

fn fail(error: &str) -> ExitCode {
    tracing::error!("{error}");
    match serde_json::to_string(&Failure {
        success: false,
        error,
    }) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error serializing failure: {e}"),
    }
    ExitCode::FAILURE
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("error serializing output: {e}")),
    }
}

fn save_report(output_dir: &Path, json: &str) -> std::io::Result<PathBuf> {
    let path = output_dir.join(RESULT_FILE);
    std::fs::write(&path, json)?;
    Ok(path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { &cli.log_level });

    if cli.list_formats {
        return print_json(&SupportedFormats::current());
    }

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => return fail(&msg),
    };

    let inputs = match retouch_io::collect_inputs(&cli.input_dir, !cli.no_recursive) {
        Ok(inputs) => inputs,
        Err(e) => return fail(&e.to_string()),
    };
    tracing::info!(
        count = inputs.len(),
        dir = %cli.input_dir.display(),
        "collected inputs"
    );

    if cli.dry_run {
        return print_json(&retouch_io::validate_inputs(&inputs));
    }

    let workspace_root = cli
        .temp_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("retouch"));
    let processor = BatchProcessor::with_defaults(workspace_root);

    let start_time = timestamp();
    let report = match processor.run(&inputs, &cli.output_dir, &config) {
        Ok(report) => report,
        Err(e) => return fail(&e.to_string()),
    };

    let json = match serde_json::to_string_pretty(&Success {
        success: true,
        start_time,
        end_time: timestamp(),
        report: &report,
    }) {
        Ok(json) => json,
        Err(e) => return fail(&format!("error serializing report: {e}")),
    };
    match save_report(&cli.output_dir, &json) {
        Ok(path) => tracing::debug!(path = %path.display(), "report saved"),
        Err(e) => tracing::warn!(%e, "could not save {RESULT_FILE}"),
    }
    println!("{json}");

    if job_succeeded(&report, cli.strict) {
        ExitCode::SUCCESS
    } else {
        tracing::error!(failed = report.failed, "batch finished with failures");
        ExitCode::FAILURE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("retouch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_build_high_preset() {
        let cli = parse(&["in", "out"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, JobConfig::default());
        assert!(!cli.no_recursive);
    }

    #[test]
    fn quality_aliases_and_stage_list() {
        let cli = parse(&[
            "in",
            "out",
            "--quality",
            "medium",
            "--stages",
            "whiteBalance,sharpening,white_balance",
            "--analysis",
            "noise,histogramAnalysis",
            "--no-convert-container",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.correction.quality, QualityTier::Standard);
        assert_eq!(
            config.correction.stages,
            Some(vec![
                StageKind::WhiteBalance,
                StageKind::Sharpening,
                StageKind::WhiteBalance
            ])
        );
        assert_eq!(
            config.analysis,
            vec![AnalysisKind::Noise, AnalysisKind::Histogram]
        );
        assert!(!config.convert_container);
    }

    #[test]
    fn unknown_stage_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["retouch", "in", "out", "--stages", "sparkle"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in",
            "out",
            "--quality",
            "fast",
            "--config-json",
            r#"{"correction":{"quality":"professional"},"output_quality":80}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.correction.quality, QualityTier::High);
        assert_eq!(config.output_quality, 80);
    }

    #[test]
    fn bad_config_json_is_an_error() {
        let cli = parse(&["in", "out", "--config-json", "{"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn success_json_flattens_report() {
        let report = BatchReport::default();
        let json = serde_json::to_value(Success {
            success: true,
            start_time: "2026-01-02T03:04:05.000Z".into(),
            end_time: timestamp(),
            report: &report,
        })
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["succeeded"], 0);
        assert_eq!(json["start_time"], "2026-01-02T03:04:05.000Z");
        let end = json["end_time"].as_str().unwrap();
        assert!(end.ends_with('Z') && end.contains('T'), "{end}");
    }

    #[test]
    fn strict_mode_fails_on_failed_files() {
        let clean = BatchReport::default();
        let failed = BatchReport {
            failed: 1,
            ..BatchReport::default()
        };
        assert!(job_succeeded(&clean, true));
        assert!(job_succeeded(&failed, false));
        assert!(!job_succeeded(&failed, true));
    }

    #[test]
    fn verbose_and_strict_flags_parse() {
        let cli = parse(&["in", "out", "-v", "--strict"]);
        assert!(cli.verbose && cli.strict);
    }
}
