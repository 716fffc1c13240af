//! Pass input files
//!
//! Imports and intake read JSON arrays of already-decoded records: members,
//! transactions or booking requests.

use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a JSON array of records from `path`
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of `T`.
pub async fn read_json_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("Invalid records in '{}': {}", path.display(), e))
}
