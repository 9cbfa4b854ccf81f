//! Raster codec boundary.
//!
//! [`RasterCodec`] turns files into [`RgbImage`]s and back. [`ImageCodec`]
//! is the `image`-crate implementation. [`write_new`] wraps any codec
//! with an atomic, no-clobber write: the encoded bytes go to a temporary
//! file beside the target, which is then linked into place only if the
//! target does not exist yet.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ExtendedColorType, ImageEncoder};
use retouch_pipeline::RgbImage;

/// JPEG quality used when the caller does not choose one.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Errors raised while reading or writing raster files.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The file could not be opened or decoded.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Encoding the image failed.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output already exists and was left untouched.
    #[error("output already exists: {}", path.display())]
    OutputExists {
        /// The existing output.
        path: PathBuf,
    },
}

/// Reads and encodes raster images.
pub trait RasterCodec {
    /// Decode the file at `path` into an 8-bit RGB image.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the file cannot be read or decoded.
    fn read(&self, path: &Path) -> Result<RgbImage, CodecError>;

    /// Encode `image` as JPEG at `quality` (1..=100) into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if encoding fails.
    fn encode_jpeg(
        &self,
        image: &RgbImage,
        quality: u8,
        sink: &mut dyn Write,
    ) -> Result<(), CodecError>;
}

/// [`RasterCodec`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl RasterCodec for ImageCodec {
    fn read(&self, path: &Path) -> Result<RgbImage, CodecError> {
        let read_err = |source| CodecError::Read {
            path: path.to_path_buf(),
            source,
        };
        let decoded = image::ImageReader::open(path)
            .map_err(|e| read_err(image::ImageError::IoError(e)))?
            .with_guessed_format()
            .map_err(|e| read_err(image::ImageError::IoError(e)))?
            .decode()
            .map_err(read_err)?;
        Ok(decoded.into_rgb8())
    }

    fn encode_jpeg(
        &self,
        image: &RgbImage,
        quality: u8,
        sink: &mut dyn Write,
    ) -> Result<(), CodecError> {
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(sink, quality.clamp(1, 100));
        encoder.write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(())
    }
}

/// Encode `image` to `path` without ever exposing a partial file and
/// without replacing an existing one.
///
/// # Errors
///
/// Returns [`CodecError::OutputExists`] if `path` already exists,
/// [`CodecError::Io`] for filesystem failures and any encoding error
/// from the codec. On error no file is left at `path`.
pub fn write_new(
    codec: &dyn RasterCodec,
    image: &RgbImage,
    quality: u8,
    path: &Path,
) -> Result<(), CodecError> {
    let io_err = |source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staging = tempfile::Builder::new()
        .prefix(".retouch-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(io_err)?;
    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        codec.encode_jpeg(image, quality, &mut writer)?;
        writer.flush().map_err(io_err)?;
    }
    staging.as_file().sync_all().map_err(io_err)?;

    staging.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            CodecError::OutputExists {
                path: path.to_path_buf(),
            }
        } else {
            io_err(e.error)
        }
    })?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    fn sample() -> RgbImage {
        RgbImage::from_fn(19, 11, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgb([(x * 13) as u8, (y * 23) as u8, 128])
        })
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        write_new(&ImageCodec, &sample(), DEFAULT_JPEG_QUALITY, &path).unwrap();
        let back = ImageCodec.read(&path).unwrap();
        assert_eq!(back.dimensions(), (19, 11));
    }

    #[test]
    fn existing_output_is_not_clobbered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.jpg");
        std::fs::write(&path, b"original").unwrap();
        let err = write_new(&ImageCodec, &sample(), 90, &path).unwrap_err();
        assert!(matches!(err, CodecError::OutputExists { .. }), "{err}");
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        // No staging file is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn unreadable_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = ImageCodec.read(&path).unwrap_err();
        assert!(matches!(err, CodecError::Read { .. }), "{err}");
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ImageCodec.read(Path::new("/nonexistent/x.jpg")).unwrap_err();
        assert!(matches!(err, CodecError::Read { .. }));
    }
}
