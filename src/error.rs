//! Error taxonomy shared by the repository, blob store, and service layers.
//!
//! Client-caused failures (`Validation`, `NotFound`, `DuplicateId`) map to
//! 4xx at the HTTP boundary; storage, database, and external-analysis
//! failures map to 5xx. The mapping lives in [`crate::server`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    /// Missing or malformed fields in an ingest request or stored row.
    #[error("invalid clip: {0}")]
    Validation(String),

    /// A clip with the same id already exists.
    #[error("clip id already exists: {0}")]
    DuplicateId(String),

    /// Lookup or delete miss.
    #[error("clip not found: {0}")]
    NotFound(String),

    /// Blob write or delete failed (I/O, quota).
    #[error("blob write failed: {0}")]
    StorageWrite(String),

    /// Blob or serialized-column read failed.
    #[error("blob read failed: {0}")]
    StorageRead(String),

    /// External AI analysis call failed; the upload is aborted.
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ClipError>;
