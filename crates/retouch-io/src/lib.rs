//! retouch-io: filesystem side of batch photo correction.
//!
//! Reads and writes raster files, decodes container formats through an
//! external tool, discovers inputs and runs batch jobs that feed each
//! file through [`retouch_pipeline`]. Every collaborator sits behind a
//! trait so jobs can run against fakes in tests.

pub mod codec;
pub mod container;
pub mod formats;
pub mod inputs;
pub mod job;
pub mod observer;
pub mod report;

pub use codec::{CodecError, ImageCodec, RasterCodec};
pub use container::{ContainerDecoder, DecodeError, ExternalCommandDecoder};
pub use formats::{InputKind, SupportedFormats};
pub use inputs::{InputValidation, InvalidInput, collect_inputs, validate_inputs};
pub use job::{BatchProcessor, JobConfig, JobError};
pub use observer::{JobObserver, SilentObserver, TracingObserver};
pub use report::{BatchReport, FileRecord, FileStatus};
