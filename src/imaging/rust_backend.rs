//! Pure Rust image codec backend (plus libwebp for lossy WebP).
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Decode (PDF, first page) | `lopdf` + [`pdf`](super::pdf) raster renderer |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality floor 1) |
//! | Encode → PNG, GIF | `image::DynamicImage::write_to` (quality ignored) |
//! | Encode → WebP | `webp` (lossy; `image`'s WebP encoder is lossless-only) |
//! | Encode → PDF | `lopdf`, image embedded as a DCT XObject |

use super::backend::{DecodeError, EncodeError, ImageBackend, SourceImage};
use super::params::{OutputFormat, Quality, SourceFormat};
use super::pdf;
use super::surface::Surface;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// libwebp's hard limit on either side.
const WEBP_MAX_DIMENSION: u32 = 16383;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the format to decode with: the declared MIME type when it is
/// specific, otherwise a guess from the leading bytes.
fn resolve_source_format(bytes: &[u8], mime: Option<&str>) -> Result<SourceFormat, DecodeError> {
    match mime.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) if !m.eq_ignore_ascii_case("application/octet-stream") => {
            SourceFormat::from_mime(m).ok_or_else(|| DecodeError::UnsupportedMime(m.to_string()))
        }
        _ => guess_source_format(bytes),
    }
}

fn guess_source_format(bytes: &[u8]) -> Result<SourceFormat, DecodeError> {
    if bytes.starts_with(b"%PDF-") {
        return Ok(SourceFormat::Pdf);
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok(SourceFormat::Jpeg),
        Ok(ImageFormat::Png) => Ok(SourceFormat::Png),
        Ok(ImageFormat::WebP) => Ok(SourceFormat::WebP),
        Ok(ImageFormat::Gif) => Ok(SourceFormat::Gif),
        Ok(other) => Err(DecodeError::Unreadable(format!(
            "{other:?} images are not supported"
        ))),
        Err(_) => Err(DecodeError::Unreadable(
            "unrecognized image format".to_string(),
        )),
    }
}

fn raster_format(format: SourceFormat) -> Option<ImageFormat> {
    match format {
        SourceFormat::Jpeg => Some(ImageFormat::Jpeg),
        SourceFormat::Png => Some(ImageFormat::Png),
        SourceFormat::WebP => Some(ImageFormat::WebP),
        SourceFormat::Gif => Some(ImageFormat::Gif),
        SourceFormat::Pdf => None,
    }
}

/// Composite RGBA onto white. JPEG has no alpha channel.
pub(crate) fn flatten_onto_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encode RGB pixels as baseline JPEG.
pub(crate) fn encode_jpeg(surface: &Surface, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let rgb = flatten_onto_white(surface.pixels());
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.jpeg())
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::Failed {
            format: OutputFormat::Jpeg,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_with_image(surface: &Surface, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let image_format = match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Gif => ImageFormat::Gif,
        other => {
            return Err(EncodeError::Unsupported {
                format: other,
                reason: "not a lossless raster format".to_string(),
            });
        }
    };
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(surface.pixels().clone())
        .write_to(&mut Cursor::new(&mut buf), image_format)
        .map_err(|e| EncodeError::Failed {
            format,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_webp(surface: &Surface, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    if surface.width() > WEBP_MAX_DIMENSION || surface.height() > WEBP_MAX_DIMENSION {
        return Err(EncodeError::Unsupported {
            format: OutputFormat::WebP,
            reason: format!(
                "{} exceeds the {WEBP_MAX_DIMENSION}px limit",
                surface.dimensions()
            ),
        });
    }
    let pixels = surface.pixels();
    let encoded = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height())
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| EncodeError::Failed {
            format: OutputFormat::WebP,
            reason: format!("{e:?}"),
        })?;
    Ok(encoded.to_vec())
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], mime: Option<&str>) -> Result<SourceImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let format = resolve_source_format(bytes, mime)?;
        debug!(?format, len = bytes.len(), "decoding image");

        let surface = match raster_format(format) {
            Some(image_format) => {
                let img = image::load_from_memory_with_format(bytes, image_format)
                    .map_err(|e| DecodeError::Unreadable(e.to_string()))?;
                Surface::from_image(&img)
                    .ok_or_else(|| DecodeError::Unreadable("image has no pixels".to_string()))?
            }
            None => pdf::render_first_page(bytes)?,
        };
        Ok(SourceImage::new(surface, format))
    }

    fn encode(
        &self,
        surface: &Surface,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EncodeError> {
        let quality = quality.unwrap_or_default();
        debug!(%format, quality = quality.value(), dims = %surface.dimensions(), "encoding image");

        let bytes = match format {
            OutputFormat::Jpeg => encode_jpeg(surface, quality)?,
            OutputFormat::WebP => encode_webp(surface, quality)?,
            OutputFormat::Png | OutputFormat::Gif => encode_with_image(surface, format)?,
            OutputFormat::Pdf => pdf::encode_single_page(surface, quality)?,
        };
        if bytes.is_empty() {
            return Err(EncodeError::Unsupported {
                format,
                reason: "encoder produced no data".to_string(),
            });
        }
        Ok(bytes)
    }
}
