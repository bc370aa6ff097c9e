//! Review analysis: run the prompt set over one collection file and merge the results

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use crate::config::Config;
use crate::llm::client::LLMClient;
use crate::types::CombinedResult;
use crate::utils::{format_timestamp, read_json};

pub mod combine;
pub mod processor;
pub mod prompts;

pub use combine::combine_responses;
pub use processor::{PromptOutcome, process_prompt};

/// Prompt ids used when the caller selects none
pub const DEFAULT_PROMPT_IDS: std::ops::RangeInclusive<u32> = 1..=13;

const COLLECTION_PREFIX: &str = "scraped_reviews_";

/// Handle passed through every analysis operation
#[derive(Clone)]
pub struct AnalyzerContext {
    pub config: Config,
    pub llm_client: LLMClient,
}

impl AnalyzerContext {
    /// Context backed by the configured Gemini model
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(&config.llm).context("Failed to create LLM client")?;
        Ok(Self::with_client(config, llm_client))
    }

    pub fn with_client(config: Config, llm_client: LLMClient) -> Self {
        Self { config, llm_client }
    }
}

/// Outcome of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub company: String,
    pub timestamp: String,
    pub result_path: PathBuf,
    pub result: CombinedResult,
    pub completed: Vec<u32>,
    pub exhausted: Vec<u32>,
    pub missing: Vec<u32>,
}

impl AnalysisReport {
    pub fn new(run: PromptRun, result_path: PathBuf, result: CombinedResult) -> Self {
        Self {
            company: run.company,
            timestamp: run.timestamp,
            result_path,
            result,
            completed: run.completed,
            exhausted: run.exhausted,
            missing: run.missing,
        }
    }
}

/// Company slug from a collection filename.
///
/// `scraped_reviews_acme_gmbh_20250101_120000.json` gives `acme_gmbh`; stems
/// without the collection prefix are returned whole.
pub fn extract_company_name_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !stem.starts_with(COLLECTION_PREFIX) {
        return stem;
    }

    let parts: Vec<&str> = stem.split('_').collect();
    match parts.len() {
        n if n > 4 => parts[2..n - 2].join("_"),
        4 => parts[2].to_string(),
        _ => stem,
    }
}

/// Parse a prompt selection such as `1-5,7,13`.
///
/// Duplicates are dropped, first occurrence wins.
pub fn parse_prompt_selection(selection: &str) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_prompt_id(start)?;
                let end = parse_prompt_id(end)?;
                if start > end {
                    bail!("Invalid prompt range {}", part);
                }
                start..=end
            }
            None => {
                let id = parse_prompt_id(part)?;
                id..=id
            }
        };
        for id in range {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        bail!("Prompt selection {:?} contains no ids", selection);
    }
    Ok(ids)
}

fn parse_prompt_id(text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| anyhow!("Invalid prompt id {:?}", text.trim()))
}

/// Most recently modified `*.json` file in `data_dir`
pub fn latest_collection_file(data_dir: &Path) -> Result<PathBuf> {
    let pattern = data_dir.join("*.json");
    let pattern = pattern.to_string_lossy();

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for path in glob::glob(&pattern)
        .context(format!("Invalid search pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
    {
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .context(format!("Failed to stat {}", path.display()))?;
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| anyhow!("No collection files found in {}", data_dir.display()))
}

/// Prompt outcomes of one analysis run, before combining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRun {
    pub company: String,
    pub timestamp: String,
    pub prompt_ids: Vec<u32>,
    pub completed: Vec<u32>,
    pub exhausted: Vec<u32>,
    pub missing: Vec<u32>,
}

/// Analyze a collection file with a fresh run timestamp
pub async fn analyze_file(
    ctx: &AnalyzerContext,
    input_path: &Path,
    prompt_ids: &[u32],
) -> Result<AnalysisReport> {
    let timestamp = format_timestamp(&Local::now());
    analyze_file_at(ctx, input_path, prompt_ids, &timestamp).await
}

/// Run every selected prompt, then combine the responses of this run
pub async fn analyze_file_at(
    ctx: &AnalyzerContext,
    input_path: &Path,
    prompt_ids: &[u32],
    timestamp: &str,
) -> Result<AnalysisReport> {
    let run = run_prompts(ctx, input_path, prompt_ids, timestamp).await?;
    let (result_path, result) =
        combine_responses(&ctx.config, &run.company, &run.timestamp, &run.prompt_ids).await?;
    Ok(AnalysisReport::new(run, result_path, result))
}

/// Run the selected prompts one after another over the review input
pub async fn run_prompts(
    ctx: &AnalyzerContext,
    input_path: &Path,
    prompt_ids: &[u32],
    timestamp: &str,
) -> Result<PromptRun> {
    let input: Value = read_json(input_path)
        .await
        .context("Failed to load review input")?;
    let company = extract_company_name_from_filename(input_path);
    info!(
        company = %company,
        timestamp,
        prompts = prompt_ids.len(),
        "Starting analysis of {}",
        input_path.display()
    );

    let mut run = PromptRun {
        company,
        timestamp: timestamp.to_string(),
        prompt_ids: prompt_ids.to_vec(),
        completed: Vec::new(),
        exhausted: Vec::new(),
        missing: Vec::new(),
    };

    for (index, &prompt_id) in prompt_ids.iter().enumerate() {
        info!("Processing prompt {} ({} / {})", prompt_id, index + 1, prompt_ids.len());
        match process_prompt(ctx, &input, prompt_id, &run.company, timestamp).await? {
            PromptOutcome::Completed { .. } => run.completed.push(prompt_id),
            PromptOutcome::Exhausted { .. } => run.exhausted.push(prompt_id),
            PromptOutcome::PromptMissing(_) => run.missing.push(prompt_id),
        }

        if index + 1 < prompt_ids.len() {
            let delay = ctx.config.llm.inter_prompt_delay();
            if !delay.is_zero() {
                info!("Waiting {}s before the next prompt", delay.as_secs());
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(run)
}
