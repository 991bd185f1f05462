//! Intake probes
//!
//! Cheap checks run when a file is accepted: PDF header/trailer sanity,
//! page count and metadata, or image format and pixel size.

use crate::error::PageStackError;
use image::ImageFormat;
use lopdf::Document;
use serde::Serialize;
use std::io::Cursor;

/// PDF file information extracted at intake
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Raster image information extracted at intake
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    #[serde(serialize_with = "serialize_format")]
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

fn serialize_format<S: serde::Serializer>(
    format: &ImageFormat,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(format.to_mime_type())
}

/// Header and trailer check without parsing the object graph
pub fn quick_validate(bytes: &[u8]) -> Result<(), PageStackError> {
    if bytes.len() < 8 {
        return Err(PageStackError::ParseError(
            "File too small to be a valid PDF".into(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(PageStackError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };

    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PageStackError::ParseError(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}

/// Parse a PDF and report its page count and metadata
pub fn probe_pdf(bytes: &[u8]) -> Result<DocumentInfo, PageStackError> {
    if bytes.len() < 8 || !bytes.starts_with(b"%PDF-") {
        return Err(PageStackError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    let document =
        Document::load_mem(bytes).map_err(|e| PageStackError::ParseError(e.to_string()))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PageStackError::EmptyDocument);
    }

    let (title, author) = extract_metadata(&document);

    Ok(DocumentInfo {
        page_count,
        version: extract_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

/// Identify an image and read its dimensions without decoding pixels
pub fn probe_image(bytes: &[u8]) -> Result<ImageInfo, PageStackError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PageStackError::ImageDecode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| PageStackError::ImageDecode("Unrecognized image format".into()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| PageStackError::ImageDecode(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(PageStackError::ImageDecode("Image has no pixels".into()));
    }

    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

/// Header format: %PDF-1.7
fn extract_version(bytes: &[u8]) -> String {
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info_dict = document
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| document.get_dictionary(id));

    let Ok(info_dict) = info_dict else {
        return (None, None);
    };

    let text = |key: &[u8]| {
        info_dict
            .get(key)
            .and_then(|obj| obj.as_str())
            .ok()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .filter(|s| !s.is_empty())
    };

    (text(&b"Title"[..]), text(&b"Author"[..]))
}
