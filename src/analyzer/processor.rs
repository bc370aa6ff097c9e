use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use super::AnalyzerContext;
use super::prompts::{build_payload, load_template};
use crate::llm::client::RetryOutcome;
use crate::llm::client::utils::extract_json_block;
use crate::types::{AnalysisPayload, PromptResponse};
use crate::utils::write_json_pretty;

/// What happened to one prompt of an analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    /// Response accepted and written to `path`
    Completed {
        path: PathBuf,
        response: PromptResponse,
    },
    /// Retry budget spent without an acceptable response; nothing written
    Exhausted { attempts: u32 },
    /// No template file for the prompt id
    PromptMissing(PathBuf),
}

/// Run one analysis prompt over the full review input and persist the judgment
pub async fn process_prompt(
    ctx: &AnalyzerContext,
    input: &Value,
    prompt_id: u32,
    company: &str,
    timestamp: &str,
) -> Result<PromptOutcome> {
    let config = &ctx.config;
    let prompt_path = config.prompt_file(prompt_id);
    let Some(template) = load_template(&prompt_path).await? else {
        warn!("Prompt file {} not found", prompt_path.display());
        return Ok(PromptOutcome::PromptMissing(prompt_path));
    };

    let payload = build_payload(&template, config.language, input)?;
    info!(
        prompt_id,
        model = ctx.llm_client.model_name(),
        "Sending prompt ({} characters)",
        payload.len()
    );

    let text = match ctx.llm_client.generate_validated(&payload).await {
        RetryOutcome::Success { text, .. } => text,
        RetryOutcome::Exhausted { attempts } => {
            warn!(prompt_id, "No usable response after {} attempts", attempts);
            return Ok(PromptOutcome::Exhausted { attempts });
        }
    };

    let payload = AnalysisPayload::from_json_text(extract_json_block(&text));
    if payload.is_raw() {
        warn!(prompt_id, "Response is not valid JSON, keeping raw text");
    }
    let response = PromptResponse::new(payload);

    let path = config.response_file(company, timestamp, prompt_id);
    write_json_pretty(&path, &response)
        .await
        .context(format!("Failed to save response to {}", path.display()))?;
    info!(prompt_id, "Saved response to {}", path.display());

    Ok(PromptOutcome::Completed { path, response })
}
