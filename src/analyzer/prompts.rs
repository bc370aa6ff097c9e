use anyhow::{Context, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

use crate::i18n::PromptLanguage;

/// Read a prompt template; `None` when the file does not exist
pub async fn load_template(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(template) => Ok(Some(template)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context(format!("Failed to read prompt file {}", path.display())),
    }
}

/// Template, intro phrase and the pretty-printed input, in that order
pub fn build_payload(template: &str, language: PromptLanguage, input: &Value) -> Result<String> {
    let data = serde_json::to_string_pretty(input).context("Failed to serialize review input")?;
    Ok(format!(
        "{}\n\n{}\n{}",
        template,
        language.data_intro(),
        data
    ))
}
