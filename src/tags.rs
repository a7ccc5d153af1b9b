//! Codec for the `ai_tags` column.
//!
//! Tags are an ordered sequence of strings in memory and a JSON array in the
//! `clips.ai_tags` text column. Encoding and decoding happen only at the
//! repository boundary; nothing else in the crate sees the encoded form.

use crate::error::{ClipError, Result};

/// Encode an ordered tag list to its storage representation.
pub fn encode(tags: &[String]) -> String {
    // A Vec<String> always serializes; the fallback never fires in practice.
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the storage representation back into an ordered tag list.
///
/// A column that does not parse as a JSON string array means the stored
/// row is corrupt, which surfaces as a storage read failure.
pub fn decode(encoded: &str) -> Result<Vec<String>> {
    serde_json::from_str(encoded)
        .map_err(|e| ClipError::StorageRead(format!("corrupt ai_tags encoding: {}", e)))
}
