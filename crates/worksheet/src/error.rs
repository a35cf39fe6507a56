//! Error types for the worksheet crate

use thiserror::Error;

/// Errors that can occur while parsing, exporting, or configuring a worksheet
#[derive(Error, Debug)]
pub enum WorksheetError {
    /// Error writing one of the XML-based export formats
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration file could not be decoded
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type for worksheet operations
pub type WorksheetResult<T> = Result<T, WorksheetError>;
