//! Session configuration
//!
//! Each tool page hands the session a small JSON object; every field is
//! optional and falls back to the merge tool defaults.

use crate::error::PageStackError;
use serde::{Deserialize, Serialize};

/// A4 portrait in PDF points
pub const A4: PageSize = PageSize {
    width: 595.28,
    height: 841.89,
};

/// US Letter portrait in PDF points
pub const LETTER: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Which kinds of files a tool accepts at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IntakePolicy {
    PdfOnly,
    #[default]
    PdfAndImages,
}

/// What to do with a document whose non-blank range matched no pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EmptySelectionPolicy {
    /// Fall back to every page and warn
    #[default]
    AllPages,
    /// Leave the entry out of the output and warn
    SkipEntry,
}

/// Page dimensions in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Same box turned to match the orientation of a `width` x `height` image
    pub fn oriented_for(self, width: u32, height: u32) -> PageSize {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if width > height {
            PageSize {
                width: long,
                height: short,
            }
        } else {
            PageSize {
                width: short,
                height: long,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub intake: IntakePolicy,
    /// Upper bound for pages generated from images
    pub max_page_size: PageSize,
    pub empty_selection: EmptySelectionPolicy,
    /// How long the page layer should show each notification
    pub notification_ms: u32,
    /// Appended to the first file's stem when no output name is given
    pub output_suffix: String,
    pub max_file_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            intake: IntakePolicy::PdfAndImages,
            max_page_size: A4,
            empty_selection: EmptySelectionPolicy::AllPages,
            notification_ms: 3000,
            output_suffix: "_merged".to_string(),
            max_file_bytes: 100 * 1024 * 1024,
        }
    }
}

impl SessionConfig {
    /// Preset for the PDF-only merge tool
    pub fn pdf_merge() -> Self {
        Self {
            intake: IntakePolicy::PdfOnly,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PageStackError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PageStackError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PageStackError> {
        let PageSize { width, height } = self.max_page_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PageStackError::SerializationError(format!(
                "maxPageSize must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_a4_pdf_and_images() {
        let config = SessionConfig::default();
        assert_eq!(config.intake, IntakePolicy::PdfAndImages);
        assert_eq!(config.max_page_size, A4);
        assert_eq!(config.notification_ms, 3000);
    }

    #[test]
    fn test_from_json_partial_keeps_defaults() {
        let config =
            SessionConfig::from_json(r#"{"intake":"pdfOnly","outputSuffix":"_joined"}"#).unwrap();
        assert_eq!(config.intake, IntakePolicy::PdfOnly);
        assert_eq!(config.output_suffix, "_joined");
        assert_eq!(config.empty_selection, EmptySelectionPolicy::AllPages);
        assert_eq!(config.max_page_size, A4);
    }

    #[test]
    fn test_from_json_page_size_and_policy() {
        let config = SessionConfig::from_json(
            r#"{"maxPageSize":{"width":612,"height":792},"emptySelection":"skipEntry"}"#,
        )
        .unwrap();
        assert_eq!(config.max_page_size, LETTER);
        assert_eq!(config.empty_selection, EmptySelectionPolicy::SkipEntry);
    }

    #[test]
    fn test_from_json_blank_is_default() {
        assert_eq!(SessionConfig::from_json("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = SessionConfig::from_json("{not json");
        assert!(matches!(result, Err(PageStackError::SerializationError(_))));
    }

    #[test]
    fn test_from_json_rejects_degenerate_page_size() {
        for json in [
            r#"{"maxPageSize":{"width":0,"height":792}}"#,
            r#"{"maxPageSize":{"width":612,"height":-10}}"#,
        ] {
            let result = SessionConfig::from_json(json);
            assert!(
                matches!(result, Err(PageStackError::SerializationError(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_pdf_merge_preset_only_changes_intake() {
        let config = SessionConfig::pdf_merge();
        assert_eq!(config.intake, IntakePolicy::PdfOnly);
        assert_eq!(
            SessionConfig {
                intake: IntakePolicy::PdfAndImages,
                ..config
            },
            SessionConfig::default()
        );
    }

    #[test]
    fn test_oriented_for_landscape_image() {
        let size = A4.oriented_for(2000, 1000);
        assert!(size.width > size.height);
        assert_eq!(size.width, A4.height);
    }

    #[test]
    fn test_oriented_for_portrait_image() {
        assert_eq!(A4.oriented_for(1000, 2000), A4);
        assert_eq!(A4.oriented_for(500, 500), A4);
    }
}
