//! PDF input and output.
//!
//! Input: page 1 only, rendered onto a white surface at [`RENDER_SCALE`]
//! pixels per point. The renderer is raster-only: image XObjects are drawn at
//! the position the content stream's transformation matrix gives them
//! (`q`, `Q`, `cm`, `Do`, nested forms included). Vector paths and text are
//! not rasterized.
//!
//! Output: one page sized to the image (1 px = 1 pt) with the image embedded
//! as a JPEG (`DCTDecode`) XObject filling the page.

use super::backend::{DecodeError, EncodeError};
use super::calculations::pdf_render_dimensions;
use super::params::{Dimensions, OutputFormat, Quality};
use super::rust_backend::encode_jpeg;
use super::surface::Surface;
use flate2::read::ZlibDecoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::io::Read;
use tracing::{debug, warn};

/// Pixels per PDF point when rendering page 1.
pub const RENDER_SCALE: f32 = 1.5;

/// US Letter, used when a page has no MediaBox anywhere in its ancestry.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const MAX_FORM_DEPTH: usize = 8;
const MAX_INHERIT_DEPTH: usize = 32;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn unreadable(reason: impl Into<String>) -> DecodeError {
    DecodeError::Unreadable(reason.into())
}

// ============================================================================
// Transformation matrix
// ============================================================================

/// PDF affine matrix `[a b c d e f]`; points are row vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f32> = operands.iter().filter_map(number).collect();
        match values.as_slice() {
            &[a, b, c, d, e, f] => Some(Self { a, b, c, d, e, f }),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

// ============================================================================
// Object lookups
// ============================================================================

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up `key` on a page, walking up `Parent` links for inheritable attributes.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box(doc: &Document, page: &Dictionary) -> [f32; 4] {
    let parsed = inherited(doc, page, b"MediaBox").and_then(|obj| match obj {
        Object::Array(items) => {
            let values: Vec<f32> = items
                .iter()
                .filter_map(|item| resolve(doc, item).and_then(number))
                .collect();
            <[f32; 4]>::try_from(values).ok()
        }
        _ => None,
    });
    parsed.unwrap_or(DEFAULT_MEDIA_BOX)
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

fn name_of<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a [u8]> {
    match resolve(doc, obj)? {
        Object::Name(name) => Some(name),
        Object::Array(items) => items.first().and_then(|first| name_of(doc, first)),
        _ => None,
    }
}

/// Filter names of a stream, outermost first.
fn filters<'a>(doc: &'a Document, dict: &'a Dictionary) -> Vec<&'a [u8]> {
    let Some(obj) = dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) else {
        return Vec::new();
    };
    match obj {
        Object::Name(name) => vec![name.as_slice()],
        Object::Array(items) => items.iter().filter_map(|i| name_of(doc, i)).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Decode: render page 1
// ============================================================================

/// Render page 1 of a PDF at [`RENDER_SCALE`].
pub fn render_first_page(bytes: &[u8]) -> Result<Surface, DecodeError> {
    let doc = Document::load_mem(bytes).map_err(|e| unreadable(format!("invalid PDF: {e}")))?;
    let pages = doc.get_pages();
    let Some(&page_id) = pages.values().next() else {
        return Err(unreadable("PDF has no pages"));
    };
    if pages.len() > 1 {
        debug!(pages = pages.len(), "rendering first page only");
    }
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| unreadable(format!("invalid page object: {e}")))?;

    let [llx, lly, urx, ury] = media_box(&doc, page);
    let dims = pdf_render_dimensions(urx - llx, ury - lly, RENDER_SCALE)
        .ok_or_else(|| unreadable("page has no area"))?
        .within_pixel_limit()
        .map_err(|e| unreadable(format!("page too large to render: {e}")))?;
    let (top, left) = (ury.max(lly), llx.min(urx));

    // User space → device pixels, y flipped so the top edge lands on row 0.
    let device = Matrix {
        a: RENDER_SCALE,
        b: 0.0,
        c: 0.0,
        d: -RENDER_SCALE,
        e: -left * RENDER_SCALE,
        f: top * RENDER_SCALE,
    };

    let mut renderer = PageRenderer {
        doc: &doc,
        canvas: Surface::filled(dims, WHITE),
    };
    let resources = inherited(&doc, page, b"Resources").and_then(|r| resolve_dict(&doc, r));
    renderer.run_page(page_id, resources, device);
    Ok(renderer.canvas)
}

struct PageRenderer<'a> {
    doc: &'a Document,
    canvas: Surface,
}

impl<'a> PageRenderer<'a> {
    fn run_page(&mut self, page_id: ObjectId, resources: Option<&'a Dictionary>, ctm: Matrix) {
        let content = match self.doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                warn!("skipping unreadable page content: {e}");
                return;
            }
        };
        match Content::decode(&content) {
            Ok(content) => self.run(&content.operations, resources, ctm, 0),
            Err(e) => warn!("skipping undecodable page content: {e}"),
        }
    }

    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        base: Matrix,
        depth: usize,
    ) {
        let mut ctm = base;
        let mut saved = Vec::new();
        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(m) = saved.pop() {
                        ctm = m;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        ctm = m.concat(&ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.paint_xobject(name, resources, ctm, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn paint_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) {
        let doc = self.doc;
        let stream = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve_dict(doc, x))
            .and_then(|x| x.get(name).ok())
            .and_then(|obj| resolve(doc, obj));
        let Some(Object::Stream(stream)) = stream else {
            debug!(name = %String::from_utf8_lossy(name), "missing XObject");
            return;
        };

        match stream.dict.get(b"Subtype").ok().and_then(|s| name_of(doc, s)) {
            Some(b"Image") => self.draw_image(stream, ctm),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let Ok(content) = Content::decode(&content) else {
                    warn!("skipping undecodable form XObject");
                    return;
                };
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| resolve(doc, m))
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(doc, r))
                    .or(resources);
                self.run(
                    &content.operations,
                    form_resources,
                    form_matrix.concat(&ctm),
                    depth + 1,
                );
            }
            _ => {}
        }
    }

    fn draw_image(&mut self, stream: &Stream, ctm: Matrix) {
        if matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
            return;
        }
        let image = match decode_image_xobject(self.doc, stream) {
            Ok(image) => image,
            Err(reason) => {
                warn!("skipping image XObject: {reason}");
                return;
            }
        };

        // The image occupies the unit square; row 0 is at y = 1.
        let origin = ctm.apply(0.0, 0.0);
        let right = ctm.apply(1.0, 0.0);
        let up = ctm.apply(0.0, 1.0);
        let far = ctm.apply(1.0, 1.0);
        let xs = [origin.0, right.0, up.0, far.0];
        let ys = [origin.1, right.1, up.1, far.1];
        let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min).round();
        let max_x = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).round();
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min).round();
        let max_y = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).round();

        let width = max_x - min_x;
        let height = max_y - min_y;
        let limit = 8.0 * self.canvas.width().max(self.canvas.height()) as f32;
        let in_range = width >= 1.0 && height >= 1.0 && width <= limit && height <= limit;
        let size = Dimensions::new(width as u32, height as u32)
            .ok()
            .filter(|size| in_range && size.within_pixel_limit().is_ok());
        let Some(size) = size else {
            debug!(width, height, "image placement outside drawable range");
            return;
        };

        let (w, h) = (size.width(), size.height());
        let mut placed = imageops::resize(&image, w, h, FilterType::Triangle);
        if right.0 < origin.0 {
            imageops::flip_horizontal_in_place(&mut placed);
        }
        if up.1 > origin.1 {
            imageops::flip_vertical_in_place(&mut placed);
        }
        self.canvas.draw_over(&placed, min_x as i64, min_y as i64);
    }
}

fn color_components(doc: &Document, dict: &Dictionary) -> Result<usize, String> {
    let Some(space) = dict.get(b"ColorSpace").ok().and_then(|c| resolve(doc, c)) else {
        return Err("image has no color space".to_string());
    };
    let family = name_of(doc, space).ok_or("unreadable color space")?;
    match family {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        b"ICCBased" => {
            let Object::Array(items) = space else {
                return Err("malformed ICCBased color space".to_string());
            };
            items
                .get(1)
                .and_then(|profile| resolve_dict(doc, profile))
                .and_then(|profile| integer(doc, profile, b"N"))
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| matches!(n, 1 | 3 | 4))
                .ok_or_else(|| "unsupported ICC profile".to_string())
        }
        other => Err(format!(
            "unsupported color space {}",
            String::from_utf8_lossy(other)
        )),
    }
}

fn decode_image_xobject(doc: &Document, stream: &Stream) -> Result<RgbaImage, String> {
    let dict = &stream.dict;
    match filters(doc, dict).as_slice() {
        [b"DCTDecode"] => image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map(|img| img.to_rgba8())
            .map_err(|e| e.to_string()),
        [] => raw_to_rgba(&sample_layout(doc, dict)?, &stream.content),
        [b"FlateDecode"] => {
            let layout = sample_layout(doc, dict)?;
            // PNG predictors prefix every row with one tag byte.
            let bound = layout.len.saturating_add(layout.height as usize) as u64;
            let mut inflated = Vec::new();
            ZlibDecoder::new(stream.content.as_slice())
                .take(bound)
                .read_to_end(&mut inflated)
                .map_err(|e| format!("corrupt Flate data: {e}"))?;
            let inflated = undo_png_predictor(doc, dict, inflated)?;
            raw_to_rgba(&layout, &inflated)
        }
        other => Err(format!(
            "unsupported filter chain {:?}",
            other
                .iter()
                .map(|f| String::from_utf8_lossy(f))
                .collect::<Vec<_>>()
        )),
    }
}

fn image_size(doc: &Document, dict: &Dictionary) -> Result<Dimensions, String> {
    let width = integer(doc, dict, b"Width").and_then(|w| u32::try_from(w).ok());
    let height = integer(doc, dict, b"Height").and_then(|h| u32::try_from(h).ok());
    let (Some(width), Some(height)) = (width, height) else {
        return Err("image has no valid size".to_string());
    };
    Dimensions::new(width, height)
        .map_err(|e| e.to_string())?
        .within_pixel_limit()
        .map_err(|e| e.to_string())
}

/// Shape of an uncompressed 8-bit image XObject.
#[derive(Debug)]
struct SampleLayout {
    width: u32,
    height: u32,
    components: usize,
    /// Bytes of sample data the image needs.
    len: usize,
}

fn sample_layout(doc: &Document, dict: &Dictionary) -> Result<SampleLayout, String> {
    let size = image_size(doc, dict)?;
    if integer(doc, dict, b"BitsPerComponent").unwrap_or(8) != 8 {
        return Err("only 8-bit images are supported".to_string());
    }
    let components = color_components(doc, dict)?;
    let len = (size.width() as usize)
        .checked_mul(size.height() as usize)
        .and_then(|pixels| pixels.checked_mul(components))
        .ok_or_else(|| format!("{size} image overflows the address space"))?;
    Ok(SampleLayout {
        width: size.width(),
        height: size.height(),
        components,
        len,
    })
}

fn raw_to_rgba(layout: &SampleLayout, data: &[u8]) -> Result<RgbaImage, String> {
    let SampleLayout {
        width,
        height,
        components,
        len,
    } = *layout;
    if data.len() < len {
        return Err(format!("image data too short: {} < {len} bytes", data.len()));
    }

    let rgba = data[..len]
        .chunks_exact(components)
        .flat_map(|px| match *px {
            [g] => [g, g, g, 255],
            [r, g, b] => [r, g, b, 255],
            [c, m, y, k] => {
                let ink = |v: u8| ((255 - v as u32) * (255 - k as u32) / 255) as u8;
                [ink(c), ink(m), ink(y), 255]
            }
            _ => [0, 0, 0, 255],
        })
        .collect();
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| "pixel buffer size mismatch".to_string())
}

/// Reverse PNG row predictors (`/Predictor` ≥ 10) on inflated image data.
fn undo_png_predictor(doc: &Document, dict: &Dictionary, data: Vec<u8>) -> Result<Vec<u8>, String> {
    let Some(params) = dict.get(b"DecodeParms").ok().and_then(|p| resolve_dict(doc, p)) else {
        return Ok(data);
    };
    let predictor = integer(doc, params, b"Predictor").unwrap_or(1);
    if predictor < 10 {
        return Ok(data);
    }
    let colors = integer(doc, params, b"Colors").unwrap_or(1).max(1) as usize;
    let columns = integer(doc, params, b"Columns").unwrap_or(1).max(1) as usize;
    let bpp = colors;
    let row_len = colors
        .checked_mul(columns)
        .filter(|len| *len < data.len())
        .ok_or_else(|| format!("predictor rows of {colors}x{columns} exceed the image data"))?;

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks(row_len + 1) {
        let Some((&filter, row)) = chunk.split_first() else {
            break;
        };
        if row.len() < row_len {
            break;
        }
        let mut cur = row.to_vec();
        for i in 0..row_len {
            let left = if i >= bpp { cur[i - bpp] } else { 0 };
            let above = prev[i];
            let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match filter {
                0 => 0,
                1 => left,
                2 => above,
                3 => ((left as u16 + above as u16) / 2) as u8,
                4 => paeth(left, above, upper_left),
                other => return Err(format!("invalid PNG predictor {other}")),
            };
            cur[i] = cur[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&cur);
        prev = cur;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

// ============================================================================
// Encode: single-page PDF
// ============================================================================

/// Wrap a surface in a one-page PDF of the same size in points.
pub fn encode_single_page(surface: &Surface, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let failed = |reason: String| EncodeError::Failed {
        format: OutputFormat::Pdf,
        reason,
    };
    let dims = surface.dimensions();
    debug!(%dims, "writing PDF page");

    let jpeg = encode_jpeg(surface, quality).map_err(|e| failed(e.to_string()))?;
    let (w, h) = (dims.width() as i64, dims.height() as i64);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0_i64.into(), 0_i64.into(), h.into(), 0_i64.into(), 0_i64.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| failed(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), w.into(), h.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| failed(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;

    const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);

    /// Two blank pages; page 1 is 100×50 pt, page 2 is 300×300 pt.
    fn two_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for (w, h) in [(100_i64, 50_i64), (300, 300)] {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0_i64.into(), 0_i64.into(), w.into(), h.into()],
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn pdf_with_media_box(width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), width.into(), height.into()],
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn gray_image(width: i64, height: i64, content: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            content,
        )
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn matrix_concat_applies_left_first() {
        let scale = Matrix {
            a: 2.0,
            d: 3.0,
            ..Matrix::IDENTITY
        };
        let shift = Matrix {
            e: 10.0,
            f: 20.0,
            ..Matrix::IDENTITY
        };
        assert_eq!(scale.concat(&shift).apply(1.0, 1.0), (12.0, 23.0));
        assert_eq!(shift.concat(&scale).apply(1.0, 1.0), (22.0, 63.0));
    }

    #[test]
    fn renders_only_first_page_at_scale() {
        let surface = render_first_page(&two_page_pdf()).unwrap();
        assert_eq!(surface.dimensions(), Dimensions::new(150, 75).unwrap());
        assert!(surface.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(
            render_first_page(b"%PDF-1.5 this is not a pdf"),
            Err(DecodeError::Unreadable(_))
        ));
    }

    #[test]
    fn huge_media_box_is_unreadable() {
        let result = render_first_page(&pdf_with_media_box(2_000_000_000, 2_000_000_000));
        assert!(
            matches!(&result, Err(DecodeError::Unreadable(reason)) if reason.contains("too large")),
            "got {result:?}"
        );
    }

    #[test]
    fn huge_image_xobject_is_rejected() {
        let doc = Document::with_version("1.5");
        let stream = gray_image(2_000_000_000, 2_000_000_000, vec![0; 16]);
        assert!(decode_image_xobject(&doc, &stream).is_err());
    }

    #[test]
    fn raw_image_decodes_gray_samples() {
        let doc = Document::with_version("1.5");
        let stream = gray_image(2, 1, vec![0, 255]);
        let image = decode_image_xobject(&doc, &stream).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn flate_image_inflates_only_what_it_needs() {
        let doc = Document::with_version("1.5");
        let mut stream = gray_image(2, 2, zlib(&[7; 1 << 20]));
        stream.dict.set("Filter", "FlateDecode");
        let image = decode_image_xobject(&doc, &stream).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert!(image.pixels().all(|p| p.0 == [7, 7, 7, 255]));
    }

    #[test]
    fn predictor_wider_than_data_is_rejected() {
        let mut doc = Document::with_version("1.5");
        let params_id = doc.add_object(dictionary! {
            "Predictor" => 12_i64,
            "Colors" => 1_i64,
            "Columns" => 1_000_000_000_000_i64,
        });
        let dict = dictionary! { "DecodeParms" => params_id };
        assert!(undo_png_predictor(&doc, &dict, vec![0, 1, 2]).is_err());
    }

    #[test]
    fn encoded_page_matches_image_size() {
        let surface = Surface::filled(Dimensions::new(40, 30).unwrap(), RED);
        let bytes = encode_single_page(&surface, Quality::new(90)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page = doc.get_dictionary(*pages.values().next().unwrap()).unwrap();
        assert_eq!(media_box(&doc, page), [0.0, 0.0, 40.0, 30.0]);
    }

    #[test]
    fn encoded_page_renders_back_with_image() {
        let surface = Surface::filled(Dimensions::new(40, 30).unwrap(), RED);
        let bytes = encode_single_page(&surface, Quality::new(90)).unwrap();
        let rendered = render_first_page(&bytes).unwrap();
        assert_eq!(rendered.dimensions(), Dimensions::new(60, 45).unwrap());
        let [r, g, b, _] = rendered.pixels().get_pixel(30, 22).0;
        assert!(r > 180 && g < 70 && b < 70, "expected red, got {r},{g},{b}");
    }

    #[test]
    fn png_predictor_up_filter() {
        let mut doc = Document::with_version("1.5");
        let params_id = doc.add_object(dictionary! {
            "Predictor" => 12_i64,
            "Colors" => 1_i64,
            "Columns" => 2_i64,
        });
        let dict = dictionary! { "DecodeParms" => params_id };
        // Row 1 raw [5, 6]; row 2 "Up" deltas [1, 1] → [6, 7].
        let data = vec![0, 5, 6, 2, 1, 1];
        assert_eq!(
            undo_png_predictor(&doc, &dict, data).unwrap(),
            vec![5, 6, 6, 7]
        );
    }
}
