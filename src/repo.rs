//! Clip metadata persistence.
//!
//! [`ClipRepository`] is the union contract over metadata backends: insert
//! with id uniqueness, filtered listing, storage-path lookup, and
//! delete-by-id. [`SqliteClipRepository`] is the shipped backend. The
//! `ai_tags` codec ([`crate::tags`]) is applied here and nowhere else —
//! rows cross this boundary with tags as an ordered `Vec<String>`.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{ClipError, Result};
use crate::models::{Clip, ClipFilter, FileType};
use crate::tags;

#[async_trait]
pub trait ClipRepository: Send + Sync {
    /// Append one row. Fails with [`ClipError::DuplicateId`] if the id
    /// already exists and [`ClipError::Validation`] if a required field is
    /// missing or an invariant is violated.
    async fn insert(&self, clip: &Clip) -> Result<()>;

    /// Filtered listing, newest first, ties in insertion order. No
    /// pagination; the full matching set is returned.
    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>>;

    /// Blob-store key for a clip, used by the delete path.
    async fn storage_path(&self, id: &str) -> Result<Option<String>>;

    /// Remove the row. Fails with [`ClipError::NotFound`] if absent.
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct SqliteClipRepository {
    pool: SqlitePool,
}

impl SqliteClipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClipRepository for SqliteClipRepository {
    async fn insert(&self, clip: &Clip) -> Result<()> {
        validate_row(clip)?;

        let result = sqlx::query(
            r#"
            INSERT INTO clips (id, filename, file_type, file_size, storage_path, thumbnail_url, ai_summary, ai_tags, ai_category, extracted_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&clip.id)
        .bind(&clip.filename)
        .bind(clip.file_type.as_str())
        .bind(clip.file_size)
        .bind(&clip.storage_path)
        .bind(&clip.thumbnail_url)
        .bind(&clip.ai_summary)
        .bind(tags::encode(&clip.ai_tags))
        .bind(&clip.ai_category)
        .bind(&clip.extracted_text)
        .bind(clip.created_at.timestamp())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(ClipError::DuplicateId(clip.id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>> {
        let mut sql = String::from(
            "SELECT id, filename, file_type, file_size, storage_path, thumbnail_url, \
             ai_summary, ai_tags, ai_category, extracted_text, created_at FROM clips",
        );

        let mut conditions: Vec<&str> = Vec::new();
        if filter.file_type.is_some() {
            conditions.push("file_type = ?");
        }
        let pattern = filter
            .query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(like_pattern);
        if pattern.is_some() {
            conditions.push(
                "(filename LIKE ? ESCAPE '\\' OR ai_summary LIKE ? ESCAPE '\\' \
                 OR ai_tags LIKE ? ESCAPE '\\' OR ai_category LIKE ? ESCAPE '\\')",
            );
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        // rowid breaks created_at ties in insertion order.
        sql.push_str(" ORDER BY created_at DESC, rowid ASC");

        let mut query = sqlx::query(&sql);
        if let Some(ft) = filter.file_type {
            query = query.bind(ft.as_str());
        }
        if let Some(p) = &pattern {
            for _ in 0..4 {
                query = query.bind(p.clone());
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_clip).collect()
    }

    async fn storage_path(&self, id: &str) -> Result<Option<String>> {
        let path: Option<String> = sqlx::query_scalar("SELECT storage_path FROM clips WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(path)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM clips WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClipError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Row-level invariants, enforced regardless of which caller built the Clip.
fn validate_row(clip: &Clip) -> Result<()> {
    if clip.id.trim().is_empty() {
        return Err(ClipError::Validation("id must not be empty".into()));
    }
    if clip.filename.trim().is_empty() {
        return Err(ClipError::Validation("filename must not be empty".into()));
    }
    if clip.storage_path.trim().is_empty() {
        return Err(ClipError::Validation("storage_path must not be empty".into()));
    }
    if clip.file_size < 0 {
        return Err(ClipError::Validation("file_size must be >= 0".into()));
    }
    if clip.ai_summary.trim().is_empty() {
        return Err(ClipError::Validation("ai_summary must not be empty".into()));
    }
    match (clip.file_type, clip.thumbnail_url.is_some()) {
        (FileType::Image, false) => Err(ClipError::Validation(
            "image clips require a thumbnail_url".into(),
        )),
        (FileType::Pdf | FileType::Text, true) => Err(ClipError::Validation(
            "thumbnail_url is only valid for image clips".into(),
        )),
        _ => Ok(()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

/// Wrap the query in `%...%`, escaping LIKE metacharacters so the match is
/// a literal substring test.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn row_to_clip(row: &SqliteRow) -> Result<Clip> {
    let file_type_raw: String = row.get("file_type");
    let file_type = FileType::parse(&file_type_raw)
        .map_err(|_| ClipError::StorageRead(format!("unknown stored file type: {}", file_type_raw)))?;

    let encoded_tags: String = row.get("ai_tags");
    let created_ts: i64 = row.get("created_at");
    let created_at = DateTime::from_timestamp(created_ts, 0)
        .ok_or_else(|| ClipError::StorageRead(format!("invalid created_at: {}", created_ts)))?;

    Ok(Clip {
        id: row.get("id"),
        filename: row.get("filename"),
        file_type,
        file_size: row.get("file_size"),
        storage_path: row.get("storage_path"),
        thumbnail_url: row.get("thumbnail_url"),
        ai_summary: row.get("ai_summary"),
        ai_tags: tags::decode(&encoded_tags)?,
        ai_category: row.get("ai_category"),
        extracted_text: row.get("extracted_text"),
        created_at,
    })
}
