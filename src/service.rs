//! Clip service orchestration.
//!
//! [`ClipService`] coordinates the blob store and the repository for the
//! three operations the API exposes: ingest, search, and remove. Both
//! dependencies are injected trait objects, constructed once at process
//! start — there are no ambient singletons.
//!
//! Ordering rules:
//! - **Ingest** writes the blob before the row. If the row insert fails,
//!   the freshly written blob is removed best-effort before the error
//!   surfaces, so a failed ingest never leaks storage and never leaves a
//!   listable row without a backing blob.
//! - **Remove** deletes the blob before the row. A crash mid-operation
//!   leaves at worst a dangling blob, never a row pointing at nothing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ClipError, Result};
use crate::models::{Clip, ClipFilter, FileType, IngestRequest};
use crate::repo::ClipRepository;
use crate::store::BlobStore;

pub struct ClipService {
    repo: Arc<dyn ClipRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl ClipService {
    pub fn new(repo: Arc<dyn ClipRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repo, blobs }
    }

    /// Store a clip: blob first, then the metadata row.
    pub async fn ingest(&self, req: IngestRequest) -> Result<Clip> {
        req.validate()?;

        let IngestRequest {
            id,
            filename,
            file_type,
            file_size,
            bytes,
            ai_summary,
            ai_tags,
            ai_category,
            extracted_text,
        } = req;

        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());

        // Fail fast on a known duplicate so the existing clip's blob is
        // never overwritten. The primary key remains the serialization
        // point for concurrent ingests of the same id.
        if self.repo.storage_path(&id).await?.is_some() {
            return Err(ClipError::DuplicateId(id));
        }

        let storage_path = format!("{}-{}", id, filename);
        let address = self.blobs.put(&storage_path, &bytes).await?;
        let thumbnail_url = (file_type == FileType::Image).then_some(address);

        let clip = Clip {
            id,
            filename,
            file_type,
            file_size,
            storage_path,
            thumbnail_url,
            ai_summary,
            ai_tags,
            ai_category,
            extracted_text,
            created_at: Utc::now(),
        };

        if let Err(err) = self.repo.insert(&clip).await {
            // A concurrent ingest of the same id and filename may have won
            // the race; its row owns the blob at this path, so leave it.
            let blob_owned_elsewhere = matches!(err, ClipError::DuplicateId(_))
                && self
                    .repo
                    .storage_path(&clip.id)
                    .await
                    .ok()
                    .flatten()
                    .as_deref()
                    == Some(clip.storage_path.as_str());

            if !blob_owned_elsewhere {
                if let Err(cleanup) = self.blobs.delete(&clip.storage_path).await {
                    warn!(
                        storage_path = %clip.storage_path,
                        error = %cleanup,
                        "failed to remove orphaned blob after insert failure"
                    );
                }
            }
            return Err(err);
        }

        info!(
            id = %clip.id,
            file_type = %clip.file_type,
            file_size = clip.file_size,
            "clip ingested"
        );
        Ok(clip)
    }

    /// Filtered listing, newest first. Tags come back structured.
    pub async fn search(&self, filter: &ClipFilter) -> Result<Vec<Clip>> {
        self.repo.list(filter).await
    }

    /// Delete a clip: blob first (idempotent), then the row.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let storage_path = self
            .repo
            .storage_path(id)
            .await?
            .ok_or_else(|| ClipError::NotFound(id.to_string()))?;

        self.blobs.delete(&storage_path).await?;
        self.repo.delete(id).await?;

        info!(id = %id, "clip removed");
        Ok(())
    }
}
