use anyhow::Result;
use clap::Parser;
use kununu_insights::analyzer::{AnalyzerContext, latest_collection_file};
use kununu_insights::cli::{self, Command};
use kununu_insights::collector::{CollectRequest, HttpSession};
use kununu_insights::config::Config;
use kununu_insights::types::{CombinedResult, PointKind};
use kununu_insights::utils::read_json;
use kununu_insights::workflow::{self, TimingScope};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = args.into_config()?;
    init_tracing(config.verbose);

    let mut timing = TimingScope::new();

    match args.command {
        Command::Collect(collect) => {
            let request = collect_request(&config, collect.url, collect.output);
            let session = HttpSession::new(&config.collector)?;
            let report = workflow::collect(session, &config, request, &mut timing).await?;
            println!(
                "✅ Collected {} reviews for {} ({})",
                report.collection.len(),
                report.company,
                report.stop_reason
            );
            println!("📁 Saved to {}", report.path.display());
        }
        Command::Analyze { input, analysis } => {
            let input = match input {
                Some(input) => input,
                None => latest_collection_file(&config.data_dir)?,
            };
            let prompt_ids = cli::prompt_ids(analysis.prompts.as_deref())?;
            let ctx = AnalyzerContext::new(config)?;
            let report = workflow::analyze(&ctx, &input, &prompt_ids, &mut timing).await?;
            print_analysis(&report);
        }
        Command::Combine {
            company,
            timestamp,
            prompts,
        } => {
            let prompt_ids = cli::prompt_ids(prompts.as_deref())?;
            let (path, result) =
                workflow::combine(&config, &company, &timestamp, &prompt_ids, &mut timing).await?;
            println!(
                "✅ Combined {} categories into {}",
                result.categories.len(),
                path.display()
            );
        }
        Command::Run { collect, analysis } => {
            let request = collect_request(&config, collect.url, collect.output);
            let prompt_ids = cli::prompt_ids(analysis.prompts.as_deref())?;
            let session = HttpSession::new(&config.collector)?;
            let ctx = AnalyzerContext::new(config)?;
            let report =
                workflow::run_pipeline(session, &ctx, request, &prompt_ids, &mut timing).await?;
            println!(
                "✅ Collected {} reviews for {} ({})",
                report.collection.collection.len(),
                report.collection.company,
                report.collection.stop_reason
            );
            print_analysis(&report.analysis);
        }
        Command::Categories { result } => {
            let combined: CombinedResult = read_json(&result).await?;
            print_categories(&combined);
            return Ok(());
        }
    }

    println!("\n{}", timing.generate_timing_report());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn collect_request(
    config: &Config,
    url: String,
    output: Option<std::path::PathBuf>,
) -> CollectRequest {
    CollectRequest {
        url,
        max_reviews: config.collector.max_reviews,
        save_path: output,
    }
}

fn print_analysis(report: &kununu_insights::analyzer::AnalysisReport) {
    println!(
        "✅ Analysis {} for {}: {} completed, {} without usable response, {} without prompt file",
        report.timestamp,
        report.company,
        report.completed.len(),
        report.exhausted.len(),
        report.missing.len()
    );
    if !report.exhausted.is_empty() {
        println!("⚠️  No result for prompts {:?}", report.exhausted);
    }
    if !report.missing.is_empty() {
        println!("⚠️  Missing prompt files for {:?}", report.missing);
    }
    println!("📁 Result saved to {}", report.result_path.display());
}

fn print_categories(result: &CombinedResult) {
    let names = result.category_names();
    if names.is_empty() {
        println!("No categories found");
        return;
    }
    for name in names {
        match result.find_category(&name) {
            Some(category) => println!(
                "- {}: {} positive, {} critical",
                name,
                category.points(PointKind::Positive).len(),
                category.points(PointKind::Critical).len()
            ),
            None => println!("- {}: no chart available", name),
        }
    }
    let raw = result.categories.iter().filter(|c| c.is_raw()).count();
    if raw > 0 {
        println!("⚠️  {} entries contain raw model output", raw);
    }
}
