//! Database statistics overview.
//!
//! Provides a quick summary of what's captured: clip counts and byte totals
//! overall and per file type. Used by `clipvault stats` to give confidence
//! that ingests are landing as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_clips: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clips")
        .fetch_one(&pool)
        .await?;

    let total_bytes: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(file_size), 0) FROM clips")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("clipvault — Database Stats");
    println!("==========================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Clips:     {}", total_clips);
    println!("  Content:   {}", format_bytes(total_bytes.max(0) as u64));

    let type_rows = sqlx::query(
        r#"
        SELECT file_type, COUNT(*) AS clip_count, COALESCE(SUM(file_size), 0) AS byte_count
        FROM clips
        GROUP BY file_type
        ORDER BY clip_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !type_rows.is_empty() {
        println!();
        println!("  By type:");
        println!("  {:<8} {:>6}   {}", "TYPE", "CLIPS", "CONTENT");
        println!("  {}", "-".repeat(32));
        for row in &type_rows {
            let file_type: String = row.get("file_type");
            let clip_count: i64 = row.get("clip_count");
            let byte_count: i64 = row.get("byte_count");
            println!(
                "  {:<8} {:>6}   {}",
                file_type,
                clip_count,
                format_bytes(byte_count.max(0) as u64)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
