use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::i18n::PromptLanguage;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "kununu-insights.toml";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory for collected review files
    pub data_dir: PathBuf,

    /// Directory holding `prompt_{id}.txt` templates
    pub prompts_dir: PathBuf,

    /// Root directory for per-run response folders
    pub responses_dir: PathBuf,

    /// Directory for combined result files
    pub results_dir: PathBuf,

    /// Language of the data intro phrase in prompt payloads
    pub language: PromptLanguage,

    /// Review collection settings
    pub collector: CollectorConfig,

    /// LLM settings
    pub llm: LLMConfig,

    /// Verbose logging
    pub verbose: bool,
}

/// Review collection settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    /// Site root used to resolve relative pagination links
    pub base_url: String,

    /// Maximum number of reviews per collection run
    pub max_reviews: usize,

    /// Reviews dated before `today - recency_days` end the collection
    pub recency_days: i64,

    /// Pause after loading a follow-up page (milliseconds)
    pub page_delay_ms: u64,

    /// Page load timeout (seconds)
    pub timeout_seconds: u64,

    pub user_agent: String,
}

/// LLM settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// Gemini API key
    pub api_key: String,

    /// Gemini API base URL
    pub api_base_url: String,

    /// Model name
    pub model: String,

    pub temperature: Option<f64>,

    pub max_output_tokens: Option<u32>,

    /// Attempts per prompt before giving up
    pub retry_attempts: u32,

    /// Backoff after a truncated, blocked or undersized response (seconds)
    pub validation_backoff_secs: u64,

    /// Backoff after a failed call (seconds)
    pub error_backoff_secs: u64,

    /// Pause between two prompts of one run (seconds)
    pub inter_prompt_delay_secs: u64,

    /// Responses shorter than this are treated as degenerate
    pub min_response_chars: usize,

    /// Request timeout (seconds)
    pub timeout_seconds: u64,
}

impl Config {
    /// Load configuration from a toml file
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.collector.max_reviews == 0 {
            bail!("collector.max_reviews must be a positive integer");
        }
        if self.llm.retry_attempts == 0 {
            bail!("llm.retry_attempts must be at least 1");
        }
        Ok(())
    }

    /// Folder holding the response files of one analysis run
    pub fn run_responses_dir(&self, company: &str, timestamp: &str) -> PathBuf {
        self.responses_dir
            .join(format!("response_{}_{}", company, timestamp))
    }

    /// Response file of one prompt within an analysis run
    pub fn response_file(&self, company: &str, timestamp: &str, prompt_id: u32) -> PathBuf {
        self.run_responses_dir(company, timestamp)
            .join(format!("response_{}_{}_{}.json", company, timestamp, prompt_id))
    }

    /// Combined result file of an analysis run
    pub fn result_file(&self, company: &str, timestamp: &str) -> PathBuf {
        self.results_dir
            .join(format!("result_{}_{}.json", company, timestamp))
    }

    /// Template file for a prompt id
    pub fn prompt_file(&self, prompt_id: u32) -> PathBuf {
        self.prompts_dir.join(format!("prompt_{}.txt", prompt_id))
    }
}

impl LLMConfig {
    pub fn validation_backoff(&self) -> Duration {
        Duration::from_secs(self.validation_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn inter_prompt_delay(&self) -> Duration {
        Duration::from_secs(self.inter_prompt_delay_secs)
    }
}

impl CollectorConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            prompts_dir: PathBuf::from("./prompts"),
            responses_dir: PathBuf::from("./responses"),
            results_dir: PathBuf::from("./results"),
            language: PromptLanguage::default(),
            collector: CollectorConfig::default(),
            llm: LLMConfig::default(),
            verbose: false,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://www.kununu.com"),
            max_reviews: 100,
            recency_days: 2 * 365,
            page_delay_ms: 3000,
            timeout_seconds: 60,
            user_agent: String::from(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            api_base_url: String::from("https://generativelanguage.googleapis.com/v1beta"),
            model: String::from("gemini-2.5-flash-preview-05-20"),
            temperature: None,
            max_output_tokens: None,
            retry_attempts: 5,
            validation_backoff_secs: 30,
            error_backoff_secs: 5,
            inter_prompt_delay_secs: 30,
            min_response_chars: 500,
            timeout_seconds: 300,
        }
    }
}
