//! Review collection: paginate a kununu listing, parse review blocks and
//! persist the accepted ones as one collection file.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate};
use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::ReviewCollection;
use crate::utils::format_timestamp;

pub mod browser;
pub mod parser;

pub use browser::{BrowserError, BrowserSession, HttpSession};
pub use parser::{NextPage, ParsedPage, ReviewDraft, parse_page};

/// Slug used when a listing URL has no `/de/{slug}/` segment
pub const UNKNOWN_COMPANY: &str = "unknown_company";

static COMPANY_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/de/([^/]+)/").expect("company slug pattern is valid"));

/// Company slug from a listing URL such as `https://www.kununu.com/de/acme-gmbh/kommentare`
pub fn extract_company_name_from_url(url: &str) -> String {
    COMPANY_SLUG
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// `scraped_reviews_{company}_{YYYYMMDD_HHMMSS}.json`
pub fn generate_filename(company: &str, at: &DateTime<Local>) -> String {
    format!("scraped_reviews_{}_{}.json", company, format_timestamp(at))
}

/// Whether a review dated `year`/`month` lies within `recency_days` of `today`.
///
/// Reviews without a usable date are always inside the window.
pub fn is_within_recency_window(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
    recency_days: i64,
) -> bool {
    let Some(year) = year else {
        return true;
    };
    let Some(review_date) = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1) else {
        return true;
    };
    let Some(cutoff) = today.checked_sub_days(Days::new(recency_days.max(0) as u64)) else {
        return true;
    };
    review_date >= cutoff
}

/// What the caller asked to collect
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub url: String,
    pub max_reviews: usize,
    /// Destination file; generated under `data_dir` when absent
    pub save_path: Option<PathBuf>,
}

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxReviews,
    TooOld,
    Exhausted,
    NavigationFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxReviews => write!(f, "maximum number of reviews reached"),
            StopReason::TooOld => write!(f, "first review outside the recency window"),
            StopReason::Exhausted => write!(f, "all reviews loaded"),
            StopReason::NavigationFailed => write!(f, "next page could not be loaded"),
        }
    }
}

/// Result of one collection run
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub company: String,
    pub path: PathBuf,
    pub collection: ReviewCollection,
    pub stop_reason: StopReason,
    pub pages_visited: usize,
}

/// Collect reviews over HTTP and persist them
pub async fn collect_reviews(config: &Config, request: CollectRequest) -> Result<CollectionReport> {
    let session = HttpSession::new(&config.collector).context("Failed to start browser session")?;
    let now = Local::now();
    collect_with_session(session, config, request, now).await
}

/// Collect reviews through `session`, which is closed on every exit path
pub async fn collect_with_session<S>(
    mut session: S,
    config: &Config,
    request: CollectRequest,
    now: DateTime<Local>,
) -> Result<CollectionReport>
where
    S: BrowserSession,
{
    let company = extract_company_name_from_url(&request.url);
    let path = request
        .save_path
        .clone()
        .unwrap_or_else(|| config.data_dir.join(generate_filename(&company, &now)));

    let outcome = paginate(&mut session, config, &request, &company, now.date_naive()).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    let (collection, stop_reason, pages_visited) = outcome?;

    info!(
        total = collection.len(),
        pages = pages_visited,
        "Stopped collecting: {}",
        stop_reason
    );

    collection
        .save(&path)
        .await
        .context(format!("Failed to save reviews to {}", path.display()))?;
    info!("Saved reviews to {}", path.display());

    Ok(CollectionReport {
        company,
        path,
        collection,
        stop_reason,
        pages_visited,
    })
}

async fn paginate<S>(
    session: &mut S,
    config: &Config,
    request: &CollectRequest,
    company: &str,
    today: NaiveDate,
) -> Result<(ReviewCollection, StopReason, usize)>
where
    S: BrowserSession,
{
    let settings = &config.collector;
    session
        .navigate(&request.url)
        .await
        .context(format!("Failed to load listing page {}", request.url))?;

    let mut collection = ReviewCollection::new(request.url.clone());
    let mut pages_visited = 1;

    loop {
        let html = session
            .page_source()
            .await
            .context("Failed to read page source")?;
        let page = parse_page(&html, &settings.base_url);

        let mut stop = None;
        for draft in page.blocks {
            if collection.len() >= request.max_reviews {
                info!("Maximum number of reviews ({}) reached", request.max_reviews);
                stop = Some(StopReason::MaxReviews);
                break;
            }
            if draft.title.is_none() {
                continue;
            }
            if !is_within_recency_window(draft.year, draft.month, today, settings.recency_days) {
                info!("First review outside the recency window found");
                stop = Some(StopReason::TooOld);
                break;
            }
            let review_id = format!("{}_{}", company, collection.len() + 1);
            collection.push(draft.into_record(review_id, &request.url));
        }

        info!("Collected {} reviews so far...", collection.len());

        if let Some(reason) = stop {
            return Ok((collection, reason, pages_visited));
        }
        if collection.len() >= request.max_reviews {
            return Ok((collection, StopReason::MaxReviews, pages_visited));
        }

        match page.next_page {
            NextPage::Found(next_url) => {
                info!("Navigating to next page: {}", next_url);
                if let Err(e) = session.navigate(&next_url).await {
                    warn!("Could not load next page: {}", e);
                    return Ok((collection, StopReason::NavigationFailed, pages_visited));
                }
                pages_visited += 1;
                tokio::time::sleep(settings.page_delay()).await;
            }
            NextPage::Exhausted => {
                info!("No more 'load more' control found. All reviews loaded.");
                return Ok((collection, StopReason::Exhausted, pages_visited));
            }
            NextPage::Unknown(reason) => {
                warn!("Could not determine next page: {}", reason);
                return Ok((collection, StopReason::NavigationFailed, pages_visited));
            }
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
