//! Pixel operations over [`Surface`]s: resize, crop and composite.
//!
//! None of these touch codecs; they take surfaces and return new ones.

use super::calculations::composite_dimensions;
use super::params::{CropRegion, Dimensions, MergeDirection};
use super::surface::Surface;
use image::imageops::{self, FilterType};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error(
        "crop region {}x{} at ({}, {}) is outside the {image} image",
        region.width, region.height, region.x, region.y
    )]
    OutOfBounds {
        region: CropRegion,
        image: Dimensions,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("merging needs at least 2 images, got {0}")]
    NotEnoughImages(usize),
    #[error("merged image would be too large")]
    TooLarge,
}

/// Resize to exactly `dims`, ignoring the source aspect ratio.
///
/// Downscaling on both axes uses area averaging; anything else uses
/// bilinear interpolation.
pub fn resize(image: &Surface, dims: Dimensions) -> Surface {
    if image.dimensions() == dims {
        return image.clone();
    }
    let (w, h) = (dims.width(), dims.height());
    let pixels = if w <= image.width() && h <= image.height() {
        imageops::thumbnail(image.pixels(), w, h)
    } else {
        imageops::resize(image.pixels(), w, h, FilterType::Triangle)
    };
    Surface::from_rgba(pixels).unwrap_or_else(|| Surface::new(dims))
}

/// Copy exactly `region` into a new surface. Never clamps.
pub fn crop(image: &Surface, region: CropRegion) -> Result<Surface, CropError> {
    let bounds = image.dimensions();
    if !region.fits_within(bounds) {
        return Err(CropError::OutOfBounds {
            region,
            image: bounds,
        });
    }
    let view = imageops::crop_imm(image.pixels(), region.x, region.y, region.width, region.height);
    Surface::from_rgba(view.to_image()).ok_or(CropError::OutOfBounds {
        region,
        image: bounds,
    })
}

/// Concatenate images along `direction` in input order.
///
/// Every image is first normalized to the first image's dimensions.
pub fn composite(images: &[Surface], direction: MergeDirection) -> Result<Surface, MergeError> {
    let [first, ..] = images else {
        return Err(MergeError::NotEnoughImages(0));
    };
    if images.len() < 2 {
        return Err(MergeError::NotEnoughImages(images.len()));
    }

    let reference = first.dimensions();
    let count = u32::try_from(images.len()).map_err(|_| MergeError::TooLarge)?;
    let total = composite_dimensions(reference, count, direction).ok_or(MergeError::TooLarge)?;

    let mut canvas = Surface::new(total);
    for (i, image) in images.iter().enumerate() {
        let offset = i as i64;
        let (x, y) = match direction {
            MergeDirection::Horizontal => (offset * reference.width() as i64, 0),
            MergeDirection::Vertical => (0, offset * reference.height() as i64),
        };
        if image.dimensions() == reference {
            canvas.place(image, x, y);
        } else {
            canvas.place(&resize(image, reference), x, y);
        }
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn solid(w: u32, h: u32, color: [u8; 4]) -> Surface {
        Surface::filled(dims(w, h), Rgba(color))
    }

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    // =========================================================================
    // resize
    // =========================================================================

    #[test]
    fn resize_produces_exact_dimensions() {
        let src = solid(37, 23, RED);
        for (w, h) in [(1, 1), (10, 50), (37, 23), (74, 46), (200, 3), (5, 100)] {
            let out = resize(&src, dims(w, h));
            assert_eq!((out.width(), out.height()), (w, h));
        }
    }

    #[test]
    fn resize_preserves_solid_color() {
        let out = resize(&solid(100, 80, BLUE), dims(30, 20));
        assert!(out.pixels().pixels().all(|p| p.0 == BLUE));
        let up = resize(&solid(10, 8, BLUE), dims(40, 32));
        assert!(up.pixels().pixels().all(|p| p.0 == BLUE));
    }

    // =========================================================================
    // crop
    // =========================================================================

    #[test]
    fn crop_full_region_is_identity_on_dimensions() {
        let src = solid(64, 48, RED);
        let out = crop(&src, CropRegion::full(src.dimensions())).unwrap();
        assert_eq!(out.dimensions(), src.dimensions());
    }

    #[test]
    fn crop_copies_exact_region() {
        let mut src = solid(10, 10, RED);
        src.place(&solid(2, 2, BLUE), 4, 6);
        let region = CropRegion {
            x: 4,
            y: 6,
            width: 2,
            height: 2,
        };
        let out = crop(&src, region).unwrap();
        assert_eq!((out.width(), out.height()), (2, 2));
        assert!(out.pixels().pixels().all(|p| p.0 == BLUE));
    }

    #[test]
    fn crop_out_of_bounds_fails_without_clamping() {
        let src = solid(10, 10, RED);
        let region = CropRegion {
            x: 5,
            y: 5,
            width: 6,
            height: 2,
        };
        assert_eq!(
            crop(&src, region),
            Err(CropError::OutOfBounds {
                region,
                image: dims(10, 10)
            })
        );
    }

    // =========================================================================
    // composite
    // =========================================================================

    #[test]
    fn composite_horizontal_places_in_order() {
        let out = composite(&[solid(4, 3, RED), solid(4, 3, BLUE)], MergeDirection::Horizontal)
            .unwrap();
        assert_eq!((out.width(), out.height()), (8, 3));
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(out.pixels().get_pixel(x, y).0, RED);
                assert_eq!(out.pixels().get_pixel(x + 4, y).0, BLUE);
            }
        }
    }

    #[test]
    fn composite_vertical_normalizes_to_first() {
        let images = [solid(400, 300, RED), solid(500, 300, BLUE)];
        let out = composite(&images, MergeDirection::Vertical).unwrap();
        assert_eq!((out.width(), out.height()), (400, 600));
        assert_eq!(out.pixels().get_pixel(399, 299).0, RED);
        assert_eq!(out.pixels().get_pixel(399, 300).0, BLUE);
    }

    #[test]
    fn composite_needs_two_images() {
        assert_eq!(
            composite(&[], MergeDirection::Horizontal),
            Err(MergeError::NotEnoughImages(0))
        );
        assert_eq!(
            composite(&[solid(2, 2, RED)], MergeDirection::Vertical),
            Err(MergeError::NotEnoughImages(1))
        );
    }
}
