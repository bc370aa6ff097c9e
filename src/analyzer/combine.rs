use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::types::{AnalysisPayload, CombinedResult, PromptResponse};
use crate::utils::write_json_pretty;

/// Prompt id embedded as the last `_` field of a response filename
pub fn prompt_id_from_filename(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .rsplit('_')
        .next()?
        .parse()
        .ok()
}

/// Merge the response files of one run into its result file.
///
/// Missing response files are skipped. Entries are ordered by the prompt id in
/// the filename, whatever the order of `prompt_ids`.
pub async fn combine_responses(
    config: &Config,
    company: &str,
    timestamp: &str,
    prompt_ids: &[u32],
) -> Result<(PathBuf, CombinedResult)> {
    let mut found = BTreeMap::new();
    for &prompt_id in prompt_ids {
        let path = config.response_file(company, timestamp, prompt_id);
        let exists = tokio::fs::try_exists(&path)
            .await
            .context(format!("Failed to check {}", path.display()))?;
        if !exists {
            debug!(prompt_id, "No response file, skipping");
            continue;
        }
        let key = prompt_id_from_filename(&path).unwrap_or(prompt_id);
        found.insert(key, path);
    }

    let mut result = CombinedResult::default();
    for path in found.values() {
        result.categories.push(load_response(path).await?);
    }

    let result_path = config.result_file(company, timestamp);
    write_json_pretty(&result_path, &result)
        .await
        .context(format!("Failed to save result to {}", result_path.display()))?;
    info!(
        categories = result.categories.len(),
        "Saved combined result to {}",
        result_path.display()
    );

    Ok((result_path, result))
}

async fn load_response(path: &Path) -> Result<AnalysisPayload> {
    let text = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read {}", path.display()))?;
    Ok(match serde_json::from_str(&text) {
        Ok(value) => PromptResponse::unwrap_loaded(value),
        Err(_) => AnalysisPayload::Raw(text),
    })
}
