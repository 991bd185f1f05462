//! File intake
//!
//! Decides whether a dropped or picked file is something the current tool
//! accepts. The browser-reported MIME type wins; file extension and magic
//! bytes are fallbacks for drag sources that report nothing useful.

use crate::config::IntakePolicy;
use crate::error::PageStackError;

/// Coarse file classification used at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

const IMAGE_MIME_TYPES: [&str; 7] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
];

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// Classify a file from its MIME type, name and leading bytes
pub fn classify(mime: &str, name: &str, bytes: &[u8]) -> Option<FileKind> {
    let mime = mime.trim().to_ascii_lowercase();

    match mime.as_str() {
        "application/pdf" | "application/x-pdf" => return Some(FileKind::Pdf),
        m if IMAGE_MIME_TYPES.contains(&m) => return Some(FileKind::Image),
        // Browsers report "" or octet-stream for some drag sources
        "" | "application/octet-stream" => {}
        _ => return None,
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == "pdf" || bytes.starts_with(b"%PDF-") {
        Some(FileKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) || image::guess_format(bytes).is_ok()
    {
        Some(FileKind::Image)
    } else {
        None
    }
}

impl IntakePolicy {
    pub fn accepts(self, kind: FileKind) -> bool {
        match self {
            IntakePolicy::PdfOnly => kind == FileKind::Pdf,
            IntakePolicy::PdfAndImages => true,
        }
    }

    /// Value for an `<input type="file" accept=...>` attribute
    pub fn accept_attribute(self) -> &'static str {
        match self {
            IntakePolicy::PdfOnly => "application/pdf,.pdf",
            IntakePolicy::PdfAndImages => {
                "application/pdf,.pdf,image/png,image/jpeg,image/gif,image/bmp,image/webp,image/tiff"
            }
        }
    }
}

/// Classify and gate a file against the tool's policy and size limit
pub fn admit(
    policy: IntakePolicy,
    max_bytes: usize,
    name: &str,
    mime: &str,
    bytes: &[u8],
) -> Result<FileKind, PageStackError> {
    if bytes.is_empty() {
        return Err(PageStackError::UnsupportedFileType(format!(
            "{} is empty",
            name
        )));
    }

    if bytes.len() > max_bytes {
        return Err(PageStackError::UnsupportedFileType(format!(
            "{} exceeds the {} size limit",
            name,
            crate::format_bytes(max_bytes)
        )));
    }

    match classify(mime, name, bytes) {
        Some(kind) if policy.accepts(kind) => Ok(kind),
        _ => Err(PageStackError::UnsupportedFileType(format!(
            "{} is not a supported file type",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_mime() {
        assert_eq!(classify("application/pdf", "a", b""), Some(FileKind::Pdf));
        assert_eq!(classify("image/PNG", "a", b""), Some(FileKind::Image));
        assert_eq!(classify("text/plain", "a.pdf", b"%PDF-1.7"), None);
    }

    #[test]
    fn test_classify_falls_back_to_extension() {
        assert_eq!(classify("", "scan.PDF", b""), Some(FileKind::Pdf));
        assert_eq!(classify("", "photo.jpeg", b""), Some(FileKind::Image));
        assert_eq!(classify("", "notes.txt", b"hello"), None);
    }

    #[test]
    fn test_classify_falls_back_to_magic_bytes() {
        assert_eq!(
            classify("application/octet-stream", "blob", b"%PDF-1.4\n"),
            Some(FileKind::Pdf)
        );
        assert_eq!(
            classify("", "blob", b"\x89PNG\r\n\x1a\n0000"),
            Some(FileKind::Image)
        );
    }

    #[test]
    fn test_pdf_only_policy_rejects_images() {
        let result = admit(
            IntakePolicy::PdfOnly,
            1024,
            "photo.png",
            "image/png",
            b"\x89PNG",
        );
        assert!(matches!(result, Err(PageStackError::UnsupportedFileType(_))));
    }

    #[test]
    fn test_admit_enforces_size_limit() {
        let result = admit(
            IntakePolicy::PdfAndImages,
            4,
            "big.pdf",
            "application/pdf",
            b"%PDF-1.7",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_admit_rejects_empty_file() {
        let result = admit(IntakePolicy::PdfAndImages, 1024, "a.pdf", "application/pdf", b"");
        assert!(result.is_err());
    }

    #[test]
    fn test_admit_accepts_pdf() {
        let kind = admit(
            IntakePolicy::PdfOnly,
            1024,
            "a.pdf",
            "application/pdf",
            b"%PDF-1.7",
        )
        .unwrap();
        assert_eq!(kind, FileKind::Pdf);
    }
}
