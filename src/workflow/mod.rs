use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::analyzer::{self, AnalysisReport, AnalyzerContext};
use crate::collector::{self, BrowserSession, CollectRequest, CollectionReport};
use crate::config::Config;
use crate::utils::format_timestamp;

/// Per-phase wall clock timing of one CLI invocation
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: Vec<(String, Instant)>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: Vec::new(),
            phase_durations: Vec::new(),
        }
    }

    /// Start timing a phase
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .retain(|(name, _)| name != phase_name);
        self.phase_start_times
            .push((phase_name.to_string(), Instant::now()));
    }

    /// Stop timing a phase; `None` if it was never started
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let index = self
            .phase_start_times
            .iter()
            .position(|(name, _)| name == phase_name)?;
        let (name, start_time) = self.phase_start_times.remove(index);
        let duration = start_time.elapsed();
        self.phase_durations.push((name, duration));
        Some(duration)
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finished phases in completion order
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "Total time: {:.2}s\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\nPhase timings:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}s\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// Phase names
pub struct TimingKeys;

impl TimingKeys {
    pub const COLLECT: &'static str = "collect";
    pub const ANALYZE: &'static str = "analyze";
    pub const COMBINE: &'static str = "combine";
}

/// Collection and analysis of one end-to-end run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub collection: CollectionReport,
    pub analysis: AnalysisReport,
}

/// Collect through `session`, timed as the collect phase
pub async fn collect<S>(
    session: S,
    config: &Config,
    request: CollectRequest,
    timing: &mut TimingScope,
) -> Result<CollectionReport>
where
    S: BrowserSession,
{
    timing.start_phase(TimingKeys::COLLECT);
    let report = collector::collect_with_session(session, config, request, Local::now()).await;
    timing.end_phase(TimingKeys::COLLECT);
    report
}

/// Analyze one collection file, timing prompts and combine separately
pub async fn analyze(
    ctx: &AnalyzerContext,
    input_path: &Path,
    prompt_ids: &[u32],
    timing: &mut TimingScope,
) -> Result<AnalysisReport> {
    let timestamp = format_timestamp(&Local::now());

    timing.start_phase(TimingKeys::ANALYZE);
    let run = analyzer::run_prompts(ctx, input_path, prompt_ids, &timestamp).await;
    timing.end_phase(TimingKeys::ANALYZE);
    let run = run?;

    timing.start_phase(TimingKeys::COMBINE);
    let combined =
        analyzer::combine_responses(&ctx.config, &run.company, &run.timestamp, &run.prompt_ids)
            .await;
    timing.end_phase(TimingKeys::COMBINE);
    let (result_path, result) = combined?;

    Ok(AnalysisReport::new(run, result_path, result))
}

/// Re-run only the merge step of an existing analysis run
pub async fn combine(
    config: &Config,
    company: &str,
    timestamp: &str,
    prompt_ids: &[u32],
    timing: &mut TimingScope,
) -> Result<(std::path::PathBuf, crate::types::CombinedResult)> {
    timing.start_phase(TimingKeys::COMBINE);
    let combined = analyzer::combine_responses(config, company, timestamp, prompt_ids).await;
    timing.end_phase(TimingKeys::COMBINE);
    combined
}

/// Collect reviews, then analyze the file just written
pub async fn run_pipeline<S>(
    session: S,
    ctx: &AnalyzerContext,
    request: CollectRequest,
    prompt_ids: &[u32],
    timing: &mut TimingScope,
) -> Result<PipelineReport>
where
    S: BrowserSession,
{
    let collection = collect(session, &ctx.config, request, timing).await?;
    let analysis = analyze(ctx, &collection.path, prompt_ids, timing).await?;
    Ok(PipelineReport {
        collection,
        analysis,
    })
}
