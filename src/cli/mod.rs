use crate::analyzer::{DEFAULT_PROMPT_IDS, parse_prompt_selection};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::i18n::PromptLanguage;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kununu-insights - employee review collection and LLM analysis
#[derive(Parser, Debug)]
#[command(name = "kununu-insights")]
#[command(
    about = "Collects employee reviews from kununu listing pages and runs them through a fixed set of LLM analysis prompts, merging the judgments into one report."
)]
#[command(version)]
pub struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for collected review files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding prompt_{id}.txt templates
    #[arg(long, global = true)]
    pub prompts_dir: Option<PathBuf>,

    /// Root directory for per-run response folders
    #[arg(long, global = true)]
    pub responses_dir: Option<PathBuf>,

    /// Directory for combined result files
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Language of the prompt data intro (de, en)
    #[arg(long, global = true)]
    pub language: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect reviews from a listing URL
    Collect(CollectArgs),

    /// Run the analysis prompts over a collection file and combine the results
    Analyze {
        /// Collection file; defaults to the newest *.json in the data directory
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Merge the response files of an existing run
    Combine {
        /// Company slug of the run
        #[arg(long)]
        company: String,

        /// Run timestamp (YYYYMMDD_HHMMSS)
        #[arg(long)]
        timestamp: String,

        /// Prompt selection, e.g. 1-5,7,13
        #[arg(short, long)]
        prompts: Option<String>,
    },

    /// Collect, then analyze the freshly written collection file
    Run {
        #[command(flatten)]
        collect: CollectArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// List the categories found in a result file
    Categories {
        /// Result file
        #[arg(short, long)]
        result: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct CollectArgs {
    /// Listing URL, e.g. https://www.kununu.com/de/acme-gmbh/kommentare
    #[arg(short, long)]
    pub url: String,

    /// Maximum number of reviews to collect
    #[arg(short, long)]
    pub max_reviews: Option<usize>,

    /// Destination file; generated under the data directory when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Prompt selection, e.g. 1-5,7,13
    #[arg(short, long)]
    pub prompts: Option<String>,

    /// Gemini API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long)]
    pub model: Option<String>,

    /// Attempts per prompt
    #[arg(long)]
    pub retry_attempts: Option<u32>,
}

impl Args {
    /// Build the configuration: config file first, then command line overrides
    pub fn into_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(config_path) => Config::from_file(config_path)?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);
                if default_config_path.exists() {
                    Config::from_file(&default_config_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(prompts_dir) = &self.prompts_dir {
            config.prompts_dir = prompts_dir.clone();
        }
        if let Some(responses_dir) = &self.responses_dir {
            config.responses_dir = responses_dir.clone();
        }
        if let Some(results_dir) = &self.results_dir {
            config.results_dir = results_dir.clone();
        }
        if let Some(language) = &self.language {
            config.language = language
                .parse::<PromptLanguage>()
                .map_err(|e| anyhow!(e))?;
        }
        if self.verbose {
            config.verbose = true;
        }

        match &self.command {
            Command::Collect(collect) => collect.apply(&mut config),
            Command::Analyze { analysis, .. } => analysis.apply(&mut config),
            Command::Run { collect, analysis } => {
                collect.apply(&mut config);
                analysis.apply(&mut config);
            }
            Command::Combine { .. } | Command::Categories { .. } => {}
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

impl CollectArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(max_reviews) = self.max_reviews {
            config.collector.max_reviews = max_reviews;
        }
    }
}

impl AnalysisArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(api_key) = &self.api_key {
            config.llm.api_key = api_key.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.llm.retry_attempts = retry_attempts;
        }
    }
}

/// Parsed prompt selection, `1-13` when none was given
pub fn prompt_ids(selection: Option<&str>) -> Result<Vec<u32>> {
    match selection {
        Some(selection) => parse_prompt_selection(selection),
        None => Ok(DEFAULT_PROMPT_IDS.collect()),
    }
}
