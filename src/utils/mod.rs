//! Whole-file JSON persistence shared by the collector and the analyzer

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Write `value` as pretty-printed UTF-8 JSON.
///
/// The content goes to a sibling temp file first and is then renamed over the
/// destination, so readers never observe a half-written file. Missing parent
/// directories are created.
pub async fn write_json_pretty<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let content = serde_json::to_string_pretty(value)
        .context(format!("Failed to serialize {}", path.display()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, content)
        .await
        .context(format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .context(format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Read and deserialize a JSON file
pub async fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path)
        .await
        .context(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse {}", path.display()))
}

/// `YYYYMMDD_HHMMSS`, the run stamp embedded in every output filename
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
