//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Dimensions, MergeDirection};

/// Height that keeps `original`'s aspect ratio at `new_width`.
///
/// # Examples
/// ```
/// # use imageforge::imaging::{aspect_locked_height, Dimensions};
/// let hd = Dimensions::new(1920, 1080).unwrap();
/// assert_eq!(aspect_locked_height(hd, 960), 540);
/// ```
pub fn aspect_locked_height(original: Dimensions, new_width: u32) -> u32 {
    scale_side(new_width, original.height(), original.width())
}

/// Width that keeps `original`'s aspect ratio at `new_height`.
pub fn aspect_locked_width(original: Dimensions, new_height: u32) -> u32 {
    scale_side(new_height, original.width(), original.height())
}

/// `round(driver * numerator / denominator)`, never below 1.
fn scale_side(driver: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (driver as f64 * numerator as f64 / denominator as f64).round();
    (scaled as u32).max(1)
}

/// Size of a composite of `count` images normalized to `reference`.
///
/// Returns `None` when the result would overflow `u32` or exceed
/// [`MAX_PIXELS`](super::params::MAX_PIXELS).
pub fn composite_dimensions(
    reference: Dimensions,
    count: u32,
    direction: MergeDirection,
) -> Option<Dimensions> {
    let (w, h) = match direction {
        MergeDirection::Horizontal => (reference.width().checked_mul(count)?, reference.height()),
        MergeDirection::Vertical => (reference.width(), reference.height().checked_mul(count)?),
    };
    Dimensions::new(w, h).ok()?.within_pixel_limit().ok()
}

/// Pixel size of a PDF page of `width × height` points rendered at `scale`.
///
/// Returns `None` for degenerate pages.
pub fn pdf_render_dimensions(width_pt: f32, height_pt: f32, scale: f32) -> Option<Dimensions> {
    let w = (width_pt.abs() * scale).round();
    let h = (height_pt.abs() * scale).round();
    if !w.is_finite() || !h.is_finite() || w > u32::MAX as f32 || h > u32::MAX as f32 {
        return None;
    }
    Dimensions::new(w as u32, h as u32).ok()
}

/// Page orientation of a single-image PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

impl PageOrientation {
    /// Landscape iff wider than tall; square pages are portrait.
    pub fn for_dimensions(dims: Dimensions) -> Self {
        if dims.is_landscape() {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Print size in inches.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrintSize {
    pub width: f64,
    pub height: f64,
}

/// Pixels needed to print `size` at `dpi` without upscaling.
pub fn pixels_for_print(size: PrintSize, dpi: u32) -> (u32, u32) {
    let w = (size.width * dpi as f64).round().max(0.0);
    let h = (size.height * dpi as f64).round().max(0.0);
    (w as u32, h as u32)
}

/// DPI an image actually delivers when printed at `size`.
///
/// The limiting axis wins. Returns `None` for non-positive print sizes.
pub fn effective_dpi(dims: Dimensions, size: PrintSize) -> Option<f64> {
    if size.width <= 0.0 || size.height <= 0.0 {
        return None;
    }
    let horizontal = dims.width() as f64 / size.width;
    let vertical = dims.height() as f64 / size.height;
    Some(horizontal.min(vertical))
}
