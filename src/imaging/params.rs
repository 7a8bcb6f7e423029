//! Value types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the tool flows in [`operations`](super::operations), the
//! pixel work in [`transform`](super::transform), and the codecs behind
//! [`ImageBackend`](super::backend::ImageBackend).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (0–100, default 80). Clamped on construction.
//! - [`Dimensions`]: Positive pixel size. Validated on construction; surfaces
//!   are only allocated for sizes within [`MAX_PIXELS`].
//! - [`CropRegion`]: Rectangle in source-pixel space.
//! - [`SourceFormat`] / [`OutputFormat`]: What we decode from / encode to.
//! - [`MergeDirection`]: Axis for concatenating images.
//! - [`CompressionSetting`]: A fixed quality, or one the AI collaborator picks.
//! - [`OutputSpec`]: Target format, quality and file name of one output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (0-100).
///
/// 0 is maximum compression, 100 is highest fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u8);

impl Quality {
    pub const fn new(value: u32) -> Self {
        Self(if value > 100 { 100 } else { value as u8 })
    }

    pub fn value(self) -> u32 {
        self.0 as u32
    }

    /// Quality for the JPEG encoder, which has a floor of 1.
    pub fn jpeg(self) -> u8 {
        self.0.max(1)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.value()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("dimensions must be positive, got {width}x{height}")]
pub struct InvalidDimensions {
    pub width: u32,
    pub height: u32,
}

/// Most pixels a single surface may hold: 512 MiB of RGBA, the same ceiling
/// the `image` crate's default `Limits` put on decoder allocations.
pub const MAX_PIXELS: u64 = 512 * 1024 * 1024 / 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{width}x{height} exceeds the limit of {MAX_PIXELS} pixels")]
pub struct TooLarge {
    pub width: u32,
    pub height: u32,
}

/// Pixel dimensions. Both sides are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, InvalidDimensions> {
        if width == 0 || height == 0 {
            return Err(InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Build from sizes already known to be positive (decoded images, surfaces).
    pub(crate) fn from_positive(width: u32, height: u32) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }

    pub fn is_landscape(self) -> bool {
        self.width > self.height
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `self`, if a surface of this size stays within [`MAX_PIXELS`].
    pub fn within_pixel_limit(self) -> Result<Self, TooLarge> {
        if self.pixel_count() > MAX_PIXELS {
            return Err(TooLarge {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

impl TryFrom<(u32, u32)> for Dimensions {
    type Error = InvalidDimensions;

    fn try_from((width, height): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(width, height)
    }
}

impl From<Dimensions> for (u32, u32) {
    fn from(d: Dimensions) -> Self {
        (d.width, d.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = ParseError;

    /// Parse `WIDTHxHEIGHT`, e.g. `1080x1920`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseError::new("dimensions", s))?;
        let width = w.trim().parse().map_err(|_| ParseError::new("dimensions", s))?;
        let height = h.trim().parse().map_err(|_| ParseError::new("dimensions", s))?;
        Self::new(width, height).map_err(|_| ParseError::new("dimensions", s))
    }
}

/// A rectangle in source-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// The region covering a whole image.
    pub fn full(dims: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dims.width(),
            height: dims.height(),
        }
    }

    /// Whether the region is non-empty and lies entirely inside `dims`.
    pub fn fits_within(&self, dims: Dimensions) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        self.width > 0
            && self.height > 0
            && right.is_some_and(|r| r <= dims.width())
            && bottom.is_some_and(|b| b <= dims.height())
    }
}

/// Error for the `FromStr` impls in this module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Formats the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Pdf,
}

impl SourceFormat {
    /// Map a MIME type to a source format. Parameters (`;charset=...`) are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.output_format().mime_type()
    }

    /// The format a re-encode of this source keeps. PDF sources become PNG.
    pub fn raster_output(self) -> OutputFormat {
        match self {
            Self::Pdf => OutputFormat::Png,
            other => other.output_format(),
        }
    }

    fn output_format(self) -> OutputFormat {
        match self {
            Self::Jpeg => OutputFormat::Jpeg,
            Self::Png => OutputFormat::Png,
            Self::WebP => OutputFormat::WebP,
            Self::Gif => OutputFormat::Gif,
            Self::Pdf => OutputFormat::Pdf,
        }
    }
}

/// Formats the encoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Pdf,
}

impl OutputFormat {
    /// Raster formats offered by the converter, in menu order.
    pub const RASTER: [OutputFormat; 4] = [Self::Jpeg, Self::Png, Self::WebP, Self::Gif];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether the encoder honors a quality parameter for this format.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Pdf)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
            Self::Gif => "GIF",
            Self::Pdf => "PDF",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ParseError::new("output format", s)),
        }
    }
}

/// Axis along which merged images are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDirection {
    #[default]
    Horizontal,
    Vertical,
}

impl FromStr for MergeDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            _ => Err(ParseError::new("merge direction", s)),
        }
    }
}

/// How the compressor picks its quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionSetting {
    Fixed(Quality),
    /// Resolved to a concrete quality by the AI collaborator before encoding.
    AiSuggested,
}

impl Default for CompressionSetting {
    fn default() -> Self {
        Self::Fixed(Quality::default())
    }
}

/// Target of a single encode: format, optional quality and output file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub format: OutputFormat,
    pub quality: Option<Quality>,
    pub file_name: String,
}

impl OutputSpec {
    /// Output named after `source_name` with the extension swapped for `format`'s.
    pub fn for_source(source_name: &str, format: OutputFormat, quality: Option<Quality>) -> Self {
        Self {
            format,
            quality,
            file_name: crate::naming::replace_extension(source_name, format.extension()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn quality_jpeg_floor_is_one() {
        assert_eq!(Quality::new(0).jpeg(), 1);
        assert_eq!(Quality::new(90).jpeg(), 90);
    }

    #[test]
    fn dimensions_reject_zero() {
        assert!(Dimensions::new(0, 10).is_err());
        assert!(Dimensions::new(10, 0).is_err());
        assert_eq!(Dimensions::new(4, 3).unwrap().width(), 4);
    }

    #[test]
    fn pixel_limit_allows_large_photos() {
        let d = Dimensions::new(12_000, 8_000).unwrap();
        assert_eq!(d.within_pixel_limit(), Ok(d));
    }

    #[test]
    fn pixel_limit_rejects_huge_sizes() {
        let d = Dimensions::new(4_000_000_000, 1).unwrap();
        assert_eq!(
            d.within_pixel_limit(),
            Err(TooLarge {
                width: 4_000_000_000,
                height: 1
            })
        );
        let d = Dimensions::new(u32::MAX, u32::MAX).unwrap();
        assert_eq!(d.pixel_count(), u32::MAX as u64 * u32::MAX as u64);
        assert!(d.within_pixel_limit().is_err());
    }

    #[test]
    fn dimensions_parse() {
        let d: Dimensions = "1080x1920".parse().unwrap();
        assert_eq!((d.width(), d.height()), (1080, 1920));
        assert!("1080".parse::<Dimensions>().is_err());
        assert!("0x5".parse::<Dimensions>().is_err());
    }

    #[test]
    fn crop_region_full_fits() {
        let dims = Dimensions::new(640, 480).unwrap();
        assert!(CropRegion::full(dims).fits_within(dims));
    }

    #[test]
    fn crop_region_out_of_bounds() {
        let dims = Dimensions::new(100, 100).unwrap();
        let region = CropRegion {
            x: 50,
            y: 0,
            width: 51,
            height: 10,
        };
        assert!(!region.fits_within(dims));
    }

    #[test]
    fn crop_region_overflow_does_not_fit() {
        let dims = Dimensions::new(100, 100).unwrap();
        let region = CropRegion {
            x: u32::MAX,
            y: 0,
            width: 2,
            height: 2,
        };
        assert!(!region.fits_within(dims));
    }

    #[test]
    fn crop_region_empty_does_not_fit() {
        let dims = Dimensions::new(100, 100).unwrap();
        let region = CropRegion {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        };
        assert!(!region.fits_within(dims));
    }

    #[test]
    fn output_format_parse_accepts_jpg() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("WebP".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn source_format_from_mime_ignores_parameters() {
        assert_eq!(
            SourceFormat::from_mime("image/png; charset=binary"),
            Some(SourceFormat::Png)
        );
        assert_eq!(SourceFormat::from_mime("IMAGE/JPEG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_mime("image/bmp"), None);
    }

    #[test]
    fn pdf_source_reencodes_as_png() {
        assert_eq!(SourceFormat::Pdf.raster_output(), OutputFormat::Png);
        assert_eq!(SourceFormat::Gif.raster_output(), OutputFormat::Gif);
    }

    #[test]
    fn output_spec_replaces_extension() {
        let spec = OutputSpec::for_source("holiday.photo.jpg", OutputFormat::WebP, None);
        assert_eq!(spec.file_name, "holiday.photo.webp");
    }

    #[test]
    fn merge_direction_parse() {
        assert_eq!(
            "vertical".parse::<MergeDirection>().unwrap(),
            MergeDirection::Vertical
        );
        assert_eq!(MergeDirection::default(), MergeDirection::Horizontal);
    }
}
