//! Image processing: decode, transform, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` (JPEG, PNG, WebP, GIF), `lopdf` (PDF page 1) |
//! | **Resize** | `imageops::thumbnail` (downscale), `Triangle` filter (otherwise) |
//! | **Crop** | `imageops::crop_imm` |
//! | **Merge** | `imageops::replace` onto a shared canvas |
//! | **Encode** | `image` (JPEG, PNG, GIF), `webp` (lossy WebP), `lopdf` (PDF) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Value types describing image operations
//! - **Surface** / **Transform**: Owned RGBA buffers and the pixel operations over them
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level tool flows combining the above

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod pdf;
pub mod rust_backend;
mod surface;
pub mod transform;

pub use backend::{DecodeError, EncodeError, ImageBackend, SourceImage};
pub use calculations::{
    PageOrientation, PrintSize, aspect_locked_height, aspect_locked_width, composite_dimensions,
    effective_dpi, pixels_for_print,
};
pub use operations::{
    CompressionReport, Compressed, NamedOutput, PipelineError, ResizeTarget, SourceFile,
    compress_image, convert_image, crop_image, encode_output, merge_images, resize_image,
    with_decoded_image,
};
pub use params::{
    CompressionSetting, CropRegion, Dimensions, InvalidDimensions, MAX_PIXELS, MergeDirection,
    OutputFormat, OutputSpec, ParseError, Quality, SourceFormat, TooLarge,
};
pub use rust_backend::RustBackend;
pub use surface::Surface;
pub use transform::{CropError, MergeError};
