//! High-level image operations.
//!
//! These functions combine calculations, pixel transforms and the backend's
//! codecs into the flows the tools expose: decode one input, transform it,
//! encode it, and hand back a [`NamedOutput`]. Nothing here touches the
//! filesystem; writing results is the caller's job.

use super::backend::{DecodeError, EncodeError, ImageBackend, SourceImage};
use super::calculations::{aspect_locked_height, aspect_locked_width};
use super::params::{
    CropRegion, Dimensions, InvalidDimensions, MergeDirection, OutputFormat, OutputSpec, Quality,
    TooLarge,
};
use super::surface::Surface;
use super::transform::{self, CropError, MergeError};
use crate::naming;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    InvalidDimensions(#[from] InvalidDimensions),
    #[error(transparent)]
    TooLarge(#[from] TooLarge),
}

/// Quality for tools that keep the source format (resize, crop).
const REENCODE_QUALITY: Quality = Quality::new(92);

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// An input file as the tools receive it: name, raw bytes, declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime: Option<&str>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: mime.map(str::to_string),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One encoded artifact, ready to save or archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub dimensions: Dimensions,
}

/// Decode `file`, run `f` on the image, and release the pixels on every exit path.
pub fn with_decoded_image<T>(
    backend: &impl ImageBackend,
    file: &SourceFile,
    f: impl FnOnce(&SourceImage) -> Result<T>,
) -> Result<T> {
    let image = backend.decode(&file.bytes, file.mime.as_deref())?;
    f(&image)
}

/// Encode a surface into a named output.
pub fn encode_output(
    backend: &impl ImageBackend,
    surface: &Surface,
    spec: &OutputSpec,
) -> Result<NamedOutput> {
    let bytes = backend.encode(surface, spec.format, spec.quality)?;
    Ok(NamedOutput {
        file_name: spec.file_name.clone(),
        bytes,
        format: spec.format,
        dimensions: surface.dimensions(),
    })
}

/// How the resizer picks the output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    /// Exact size; the aspect ratio is not enforced.
    Exact(Dimensions),
    /// Width given, height follows the source aspect ratio.
    Width(u32),
    /// Height given, width follows the source aspect ratio.
    Height(u32),
}

impl ResizeTarget {
    /// Output size for a source of `original` size.
    ///
    /// Sizes beyond [`MAX_PIXELS`](super::params::MAX_PIXELS) are rejected
    /// before anything is allocated.
    pub fn resolve(self, original: Dimensions) -> Result<Dimensions> {
        let dims = match self {
            Self::Exact(dims) => dims,
            Self::Width(w) => Dimensions::new(w, aspect_locked_height(original, w.max(1)))?,
            Self::Height(h) => Dimensions::new(aspect_locked_width(original, h.max(1)), h)?,
        };
        Ok(dims.within_pixel_limit()?)
    }
}

/// Resize one image, keeping its format. Output: `<stem>_resized.<ext>`.
pub fn resize_image(
    backend: &impl ImageBackend,
    file: &SourceFile,
    target: ResizeTarget,
) -> Result<NamedOutput> {
    with_decoded_image(backend, file, |image| {
        let dims = target.resolve(image.dimensions())?;
        let format = image.source_format().raster_output();
        let resized = transform::resize(image.surface(), dims);
        let spec = OutputSpec {
            format,
            quality: Some(REENCODE_QUALITY),
            file_name: naming::suffixed_name(&file.name, "_resized", format),
        };
        info!(source = %file.name, from = %image.dimensions(), to = %dims, "resized");
        encode_output(backend, &resized, &spec)
    })
}

/// Re-encode one image in another format. Output: `<stem>.<target ext>`.
pub fn convert_image(
    backend: &impl ImageBackend,
    file: &SourceFile,
    format: OutputFormat,
    quality: Option<Quality>,
) -> Result<NamedOutput> {
    with_decoded_image(backend, file, |image| {
        let spec = OutputSpec::for_source(&file.name, format, quality);
        encode_output(backend, image.surface(), &spec)
    })
}

/// Byte sizes before and after compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub quality: Quality,
}

impl CompressionReport {
    /// `round((original - compressed) / original * 100)`; negative when the
    /// output grew. Zero for an empty original.
    pub fn reduction_percent(&self) -> i64 {
        if self.original_bytes == 0 {
            return 0;
        }
        let saved = self.original_bytes as f64 - self.compressed_bytes as f64;
        (saved / self.original_bytes as f64 * 100.0).round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub output: NamedOutput,
    pub report: CompressionReport,
}

/// Re-encode as JPEG at `quality`. Output: `<stem>_compressed.jpg`.
///
/// PDF inputs are compressed from their rendered first page.
pub fn compress_image(
    backend: &impl ImageBackend,
    file: &SourceFile,
    quality: Quality,
) -> Result<Compressed> {
    with_decoded_image(backend, file, |image| {
        let spec = OutputSpec {
            format: OutputFormat::Jpeg,
            quality: Some(quality),
            file_name: format!("{}_compressed.jpg", naming::stem(&file.name)),
        };
        let output = encode_output(backend, image.surface(), &spec)?;
        let report = CompressionReport {
            original_bytes: file.len(),
            compressed_bytes: output.bytes.len() as u64,
            quality,
        };
        info!(
            source = %file.name,
            quality = quality.value(),
            reduction = report.reduction_percent(),
            "compressed"
        );
        Ok(Compressed { output, report })
    })
}

/// Crop one image, keeping its format. Output: `cropped-image.<source ext>`.
pub fn crop_image(
    backend: &impl ImageBackend,
    file: &SourceFile,
    region: CropRegion,
) -> Result<NamedOutput> {
    with_decoded_image(backend, file, |image| {
        let cropped = transform::crop(image.surface(), region)?;
        let format = image.source_format().raster_output();
        let spec = OutputSpec {
            format,
            quality: Some(REENCODE_QUALITY),
            file_name: format!(
                "cropped-image.{}",
                naming::output_extension(&file.name, format)
            ),
        };
        encode_output(backend, &cropped, &spec)
    })
}

/// Merge images side by side or stacked, as PNG.
///
/// Every input is decoded before compositing; the first decode failure
/// aborts the merge.
pub fn merge_images(
    backend: &impl ImageBackend,
    files: &[SourceFile],
    direction: MergeDirection,
    file_name: &str,
) -> Result<NamedOutput> {
    if files.len() < 2 {
        return Err(MergeError::NotEnoughImages(files.len()).into());
    }
    let surfaces = files
        .iter()
        .map(|file| with_decoded_image(backend, file, |image| Ok(image.surface().clone())))
        .collect::<Result<Vec<_>>>()?;
    let merged = transform::composite(&surfaces, direction)?;
    drop(surfaces);

    let spec = OutputSpec {
        format: OutputFormat::Png,
        quality: None,
        file_name: file_name.to_string(),
    };
    info!(count = files.len(), ?direction, dims = %merged.dimensions(), "merged");
    encode_output(backend, &merged, &spec)
}
