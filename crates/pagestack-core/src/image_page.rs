//! Raster images as PDF pages
//!
//! An image becomes one page sized to the image (1 px = 1 pt), scaled down
//! when it would exceed the configured page box. Pixels are flattened onto
//! white and stored as a Flate-compressed DeviceRGB XObject.

use crate::config::PageSize;
use crate::error::PageStackError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Page size for a `width` x `height` image bounded by `bound`
///
/// The bound is turned to the image's orientation first. Aspect ratio is
/// kept; images already inside the bound are never enlarged.
pub fn fit_page(width: u32, height: u32, bound: PageSize) -> PageSize {
    let bound = bound.oriented_for(width, height);
    let (w, h) = (width as f32, height as f32);
    let scale = (bound.width / w).min(bound.height / h).min(1.0);
    PageSize {
        width: w * scale,
        height: h * scale,
    }
}

/// Decode `bytes` and append a page showing the image to `doc`
///
/// The page's `Parent` is `pages_id`; the caller links it into `Kids`.
pub fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    bytes: &[u8],
    bound: PageSize,
) -> Result<ObjectId, PageStackError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| PageStackError::ImageDecode(e.to_string()))?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PageStackError::ImageDecode("Image has no pixels".into()));
    }

    let page_size = fit_page(width, height, bound);
    let pixels = flatten_to_rgb(&image);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&pixels)
        .map_err(|e| PageStackError::OperationError(format!("Image compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PageStackError::OperationError(format!("Image compression failed: {}", e)))?;

    // Already Flate-encoded; keep Document::compress from wrapping it again
    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    )
    .with_compression(false);
    let image_id = doc.add_object(xobject);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_size.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_size.height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PageStackError::OperationError(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_size.width),
            Object::Real(page_size.height),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => Object::Reference(image_id),
            },
        },
        "Contents" => Object::Reference(content_id),
    });

    tracing::debug!(
        width,
        height,
        page_width = page_size.width,
        page_height = page_size.height,
        "added image page"
    );
    Ok(page_id)
}

/// RGB bytes with any alpha composited onto a white background
fn flatten_to_rgb(image: &DynamicImage) -> Vec<u8> {
    if !image.color().has_alpha() {
        return image.to_rgb8().into_raw();
    }

    let rgba = image.to_rgba8();
    let mut out = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        for channel in [r, g, b] {
            let blended = (channel as u16 * alpha + 255 * (255 - alpha)) / 255;
            out.push(blended as u8);
        }
    }
    out
}
