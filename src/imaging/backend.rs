//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: decode (bytes → [`SourceImage`]) and encode ([`Surface`] → bytes).
//! Pixel work in between is backend-independent and lives in
//! [`transform`](super::transform).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust apart from
//! libwebp for lossy WebP. Everything is statically linked into the binary.

use super::params::{Dimensions, OutputFormat, Quality, SourceFormat};
use super::surface::Surface;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no image data")]
    Empty,
    #[error("unsupported file type: {0}")]
    UnsupportedMime(String),
    #[error("could not read image: {0}")]
    Unreadable(String),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{format} output is not supported: {reason}")]
    Unsupported {
        format: OutputFormat,
        reason: String,
    },
    #[error("{format} encoding failed: {reason}")]
    Failed {
        format: OutputFormat,
        reason: String,
    },
}

/// A decoded image: pixels plus the format they came from.
///
/// Only created by decoding, never mutated afterwards. Owned by the
/// operation that decoded it and released when that operation returns.
#[derive(Debug, Clone)]
pub struct SourceImage {
    surface: Surface,
    format: SourceFormat,
}

impl SourceImage {
    pub fn new(surface: Surface, format: SourceFormat) -> Self {
        Self { surface, format }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.surface.dimensions()
    }

    pub fn source_format(&self) -> SourceFormat {
        self.format
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

/// Trait for image codec backends.
///
/// Implementations must be `Sync`: the batch runner shares one backend across
/// the rayon pool.
pub trait ImageBackend: Sync {
    /// Decode `bytes`. `mime` is the declared type; `None` or
    /// `application/octet-stream` means "guess from content".
    fn decode(&self, bytes: &[u8], mime: Option<&str>) -> Result<SourceImage, DecodeError>;

    /// Encode a surface. `quality` is ignored by lossless formats.
    fn encode(
        &self,
        surface: &Surface,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EncodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    /// Mock backend that records operations without running real codecs.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Decoding `b"corrupt..."` fails; decoding text like `b"40x30"` yields a
    /// surface of that size; anything else yields `default_dims`.
    pub struct MockBackend {
        pub default_dims: Dimensions,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode {
            len: usize,
            mime: Option<String>,
        },
        Encode {
            format: OutputFormat,
            quality: Option<u32>,
            width: u32,
            height: u32,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::with_dimensions(Dimensions::new(8, 6).unwrap())
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Dimensions) -> Self {
            Self {
                default_dims: dims,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8], mime: Option<&str>) -> Result<SourceImage, DecodeError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode {
                len: bytes.len(),
                mime: mime.map(str::to_string),
            });

            if bytes.is_empty() {
                return Err(DecodeError::Empty);
            }
            if bytes.starts_with(b"corrupt") {
                return Err(DecodeError::Unreadable("mock corrupt input".to_string()));
            }
            let dims = std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<Dimensions>().ok())
                .unwrap_or(self.default_dims);
            let format = mime
                .and_then(SourceFormat::from_mime)
                .unwrap_or(SourceFormat::Png);
            let surface = Surface::filled(dims, Rgba([128, 64, 32, 255]));
            Ok(SourceImage::new(surface, format))
        }

        fn encode(
            &self,
            surface: &Surface,
            format: OutputFormat,
            quality: Option<Quality>,
        ) -> Result<Vec<u8>, EncodeError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                quality: quality.map(Quality::value),
                width: surface.width(),
                height: surface.height(),
            });
            let (w, h) = (surface.width(), surface.height());
            Ok(format!("{}:{}x{}", format.extension(), w, h).into_bytes())
        }
    }

    #[test]
    fn mock_records_decode_and_encode() {
        let backend = MockBackend::new();
        let image = backend.decode(b"40x30", Some("image/jpeg")).unwrap();
        assert_eq!(image.dimensions(), Dimensions::new(40, 30).unwrap());
        assert_eq!(image.source_format(), SourceFormat::Jpeg);

        let bytes = backend
            .encode(image.surface(), OutputFormat::WebP, Some(Quality::new(70)))
            .unwrap();
        assert_eq!(bytes, b"webp:40x30");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            &ops[1],
            RecordedOp::Encode {
                format: OutputFormat::WebP,
                quality: Some(70),
                width: 40,
                height: 30
            }
        ));
    }

    #[test]
    fn mock_corrupt_input_fails() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode(b"corrupt bytes", None),
            Err(DecodeError::Unreadable(_))
        ));
        assert!(matches!(backend.decode(b"", None), Err(DecodeError::Empty)));
    }
}
