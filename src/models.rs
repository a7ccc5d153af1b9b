//! Core data models for clipvault.
//!
//! These types represent captured clips and the requests and analysis
//! results that flow through the ingest and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClipError, Result};

/// Kind of uploaded artifact, derived from the MIME type (HTTP) or file
/// extension (CLI) at ingest time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
    Text,
}

impl FileType {
    /// Stable storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Pdf => "pdf",
            FileType::Text => "text",
        }
    }

    /// Parse the wire representation. Unknown values are a caller error.
    pub fn parse(s: &str) -> Result<FileType> {
        match s {
            "image" => Ok(FileType::Image),
            "pdf" => Ok(FileType::Pdf),
            "text" => Ok(FileType::Text),
            other => Err(ClipError::Validation(format!(
                "unknown file type: '{}'. Must be image, pdf, or text.",
                other
            ))),
        }
    }

    /// Map a file extension to a clip type for CLI ingest.
    pub fn from_extension(ext: &str) -> Option<FileType> {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(FileType::Image),
            "pdf" => Some(FileType::Pdf),
            "txt" | "md" | "markdown" | "text" | "log" | "csv" => Some(FileType::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded artifact plus its AI-derived metadata.
///
/// `storage_path` always resolves to an existing blob while the row exists;
/// `thumbnail_url` is set iff `file_type` is `image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_path: String,
    pub thumbnail_url: Option<String>,
    pub ai_summary: String,
    pub ai_tags: Vec<String>,
    pub ai_category: Option<String>,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing filter: both fields optional, AND-combined when both present.
#[derive(Debug, Clone, Default)]
pub struct ClipFilter {
    /// Case-insensitive substring matched against filename, summary,
    /// serialized tags, and category.
    pub query: Option<String>,
    pub file_type: Option<FileType>,
}

/// Result of the external AI analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub tags: Vec<String>,
    pub category: String,
}

/// Validated ingest input for [`ClipService::ingest`](crate::service::ClipService::ingest).
///
/// Built from the HTTP upload body or the CLI capture pipeline. `validate`
/// rejects malformed shapes before any storage I/O happens.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Caller-supplied id; generated by the service when absent.
    pub id: Option<String>,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub bytes: Vec<u8>,
    pub ai_summary: String,
    pub ai_tags: Vec<String>,
    pub ai_category: Option<String>,
    pub extracted_text: Option<String>,
}

impl IngestRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ClipError::Validation("id must not be empty".into()));
            }
        }
        if self.filename.trim().is_empty() {
            return Err(ClipError::Validation("filename must not be empty".into()));
        }
        // The storage key embeds the filename, so it must stay a single
        // path component.
        if self.filename.contains('/') || self.filename.contains('\\') {
            return Err(ClipError::Validation(
                "filename must not contain path separators".into(),
            ));
        }
        if self.filename == "." || self.filename == ".." {
            return Err(ClipError::Validation("filename is not valid".into()));
        }
        if self.file_size < 0 {
            return Err(ClipError::Validation("file_size must be >= 0".into()));
        }
        if self.ai_summary.trim().is_empty() {
            return Err(ClipError::Validation("ai_summary must not be empty".into()));
        }
        if self.file_type == FileType::Image && self.extracted_text.is_some() {
            return Err(ClipError::Validation(
                "extracted_text is only valid for non-image clips".into(),
            ));
        }
        Ok(())
    }
}
