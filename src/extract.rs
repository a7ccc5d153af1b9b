//! Text extraction for the CLI capture path.
//!
//! Non-image clips carry an `extracted_text` field; this module derives it
//! from the raw file bytes. Images never produce text. Extraction failures
//! mean the caller handed bytes that do not decode as the declared type,
//! so they surface as validation errors and the ingest is aborted.

use crate::error::{ClipError, Result};
use crate::models::FileType;

/// Derive `extracted_text` from file bytes. Returns `None` for images.
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<Option<String>> {
    match file_type {
        FileType::Image => Ok(None),
        FileType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map(Some)
            .map_err(|e| ClipError::Validation(format!("PDF text extraction failed: {}", e))),
        FileType::Text => String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|_| ClipError::Validation("text file is not valid UTF-8".into())),
    }
}
