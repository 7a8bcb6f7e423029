//! Owned RGBA draw target.
//!
//! Every pixel operation in the crate reads from and writes to a [`Surface`].
//! A surface is never shared between operations: each pipeline creates its
//! own and drops it when the pipeline returns.

use super::params::Dimensions;
use image::{DynamicImage, Rgba, RgbaImage, imageops};

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// A fully transparent surface.
    pub fn new(dims: Dimensions) -> Self {
        Self {
            pixels: RgbaImage::new(dims.width(), dims.height()),
        }
    }

    /// A surface filled with one color.
    pub fn filled(dims: Dimensions, color: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(dims.width(), dims.height(), color),
        }
    }

    /// Wrap an RGBA buffer. Returns `None` for zero-sized buffers.
    pub fn from_rgba(pixels: RgbaImage) -> Option<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return None;
        }
        Some(Self { pixels })
    }

    /// Copy a decoded image into a new surface. Returns `None` for zero-sized images.
    pub fn from_image(image: &DynamicImage) -> Option<Self> {
        Self::from_rgba(image.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from_positive(self.pixels.width(), self.pixels.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Copy `src` onto this surface at `(x, y)`, replacing the pixels under it.
    /// Parts falling outside the surface are clipped.
    pub fn place(&mut self, src: &Surface, x: i64, y: i64) {
        imageops::replace(&mut self.pixels, &src.pixels, x, y);
    }

    /// Alpha-blend `src` over this surface at `(x, y)`, clipping at the edges.
    pub fn draw_over(&mut self, src: &RgbaImage, x: i64, y: i64) {
        imageops::overlay(&mut self.pixels, src, x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    #[test]
    fn new_surface_is_transparent() {
        let s = Surface::new(dims(3, 2));
        assert_eq!((s.width(), s.height()), (3, 2));
        assert!(s.pixels().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        assert!(Surface::from_rgba(RgbaImage::new(0, 5)).is_none());
    }

    #[test]
    fn place_replaces_and_clips() {
        let mut dst = Surface::filled(dims(4, 4), Rgba([255, 255, 255, 255]));
        let src = Surface::filled(dims(2, 2), Rgba([0, 0, 0, 0]));
        dst.place(&src, 3, 3);
        assert_eq!(dst.pixels().get_pixel(3, 3).0, [0, 0, 0, 0]);
        assert_eq!(dst.pixels().get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn draw_over_blends_opaque_source() {
        let mut dst = Surface::filled(dims(2, 2), Rgba([255, 255, 255, 255]));
        let src = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        dst.draw_over(&src, 1, 0);
        assert_eq!(dst.pixels().get_pixel(1, 0).0, [10, 20, 30, 255]);
        assert_eq!(dst.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
