//! Page-level information
//!
//! Reads page geometry for thumbnails and resolves attributes a page
//! inherits from its ancestors in the page tree.

use crate::error::PageStackError;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

/// Page tree attributes that a page may inherit from a `Pages` node
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Bound on parent-chain walks; malformed files can contain cycles
const MAX_TREE_DEPTH: usize = 64;

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
    /// 0, 90, 180 or 270
    pub rotation: i32,
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageInfo {
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, PageStackError> {
        let pages = doc.get_pages();
        let page_id = pages
            .get(&page_num)
            .ok_or_else(|| PageStackError::OperationError(format!("Page {} not found", page_num)))?;

        let page_dict = doc.get_dictionary(*page_id).map_err(|_| {
            PageStackError::OperationError(format!("Page {} is not a dictionary", page_num))
        })?;

        let media_box = inherited_attribute(doc, page_dict, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| parse_box_array(array).ok())
            .unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

        let rotation = inherited_attribute(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|angle| normalize_rotation(angle as i32))
            .unwrap_or(0);

        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width,
            height,
            rotation,
            orientation,
        })
    }

    pub fn all_from_document(doc: &Document) -> Vec<Result<Self, PageStackError>> {
        (1..=doc.get_pages().len() as u32)
            .map(|page_num| Self::from_document(doc, page_num))
            .collect()
    }
}

/// Look `key` up on the page, then on each ancestor `Pages` node
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f32; 4], PageStackError> {
    if array.len() != 4 {
        return Err(PageStackError::OperationError(
            "MediaBox must have 4 elements".into(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f32,
            Object::Real(n) => *n as f32,
            _ => {
                return Err(PageStackError::OperationError(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;
    use lopdf::dictionary;

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(270), 270);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
    }

    #[test]
    fn test_parse_box_array() {
        let array = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ];
        assert_eq!(parse_box_array(&array).unwrap(), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_parse_box_array_wrong_length() {
        assert!(parse_box_array(&[Object::Integer(0)]).is_err());
    }

    #[test]
    fn test_page_info_letter_portrait() {
        let doc = Document::load_mem(&create_test_pdf(2, "Info")).unwrap();
        let info = PageInfo::from_document(&doc, 2).unwrap();
        assert_eq!(info.page_num, 2);
        assert_eq!((info.width, info.height), (612.0, 792.0));
        assert_eq!(info.orientation, PageOrientation::Portrait);
        assert_eq!(PageInfo::all_from_document(&doc).len(), 2);
    }

    #[test]
    fn test_page_info_missing_page() {
        let doc = Document::load_mem(&create_test_pdf(1, "Info")).unwrap();
        assert!(PageInfo::from_document(&doc, 3).is_err());
    }

    #[test]
    fn test_inherited_attribute_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "Rotate" => 90,
            }),
        );

        let page_dict = doc.get_dictionary(page_id).unwrap();
        let rotate = inherited_attribute(&doc, page_dict, b"Rotate").unwrap();
        assert_eq!(rotate.as_i64().unwrap(), 90);
        assert!(inherited_attribute(&doc, page_dict, b"CropBox").is_none());
    }
}
