use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageStackError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Nothing to assemble: {0}")]
    NothingAssembled(String),

    #[error("No entry with id {0}")]
    EntryNotFound(u32),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
