//! CLI capture pipeline.
//!
//! Coordinates the full `clipvault ingest <path>` flow: read the file,
//! derive its type, enforce the per-file size ceiling, extract text for
//! non-images, call the analysis provider, and hand everything to the clip
//! service. An analysis failure aborts the capture before any storage I/O,
//! so no row and no blob are created.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::analysis::{self, AnalysisProvider};
use crate::config::Config;
use crate::extract;
use crate::models::{FileType, IngestRequest};
use crate::service::ClipService;

pub async fn run_ingest(
    config: &Config,
    service: &ClipService,
    path: &Path,
    id: Option<String>,
) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("not a file path: {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let file_type = FileType::from_extension(ext).ok_or_else(|| {
        anyhow::anyhow!(
            "unsupported file extension '{}'. Supported types: image, pdf, text.",
            ext
        )
    })?;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    if metadata.len() > config.ingest.max_file_bytes {
        bail!(
            "file is {} bytes; the ingest limit is {} bytes",
            metadata.len(),
            config.ingest.max_file_bytes
        );
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let extracted_text = extract::extract_text(&bytes, file_type)?;

    let provider = analysis::create_provider(&config.analysis)?;
    let result = match file_type {
        FileType::Image => provider.analyze_image(&bytes, image_mime(ext)).await?,
        FileType::Pdf | FileType::Text => {
            provider
                .analyze_text(extracted_text.as_deref().unwrap_or_default())
                .await?
        }
    };

    let ai_category = Some(result.category)
        .filter(|c| !c.trim().is_empty());

    let request = IngestRequest {
        id,
        filename,
        file_type,
        file_size: bytes.len() as i64,
        bytes,
        ai_summary: result.summary,
        ai_tags: result.tags,
        ai_category,
        extracted_text,
    };

    let clip = service.ingest(request).await?;

    println!("ingested {}", clip.id);
    println!("  filename: {}", clip.filename);
    println!("  type:     {}", clip.file_type);
    println!("  size:     {} bytes", clip.file_size);
    println!("  summary:  {}", clip.ai_summary);
    if !clip.ai_tags.is_empty() {
        println!("  tags:     {}", clip.ai_tags.join(", "));
    }
    if let Some(category) = &clip.ai_category {
        println!("  category: {}", category);
    }
    println!("ok");

    Ok(())
}

/// MIME type sent to the analysis provider for image uploads.
fn image_mime(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
