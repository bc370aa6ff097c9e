//! Browser session seam used by the collector

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CollectorConfig;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("failed to load {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("no page has been loaded")]
    NoPage,
}

/// A rendered-page session owned by exactly one collection run.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and make it the current page
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Markup of the current page
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// Release the session. Called once on every exit path of a run.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Headless session that renders pages by fetching their server-side markup
pub struct HttpSession {
    client: reqwest::Client,
    current: Option<String>,
}

impl HttpSession {
    pub fn new(config: &CollectorConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            current: None,
        })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "loading page");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| BrowserError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|source| BrowserError::Navigation {
                url: url.to_string(),
                source,
            })?;
        self.current = Some(body);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.current.clone().ok_or(BrowserError::NoPage)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.current = None;
        debug!("browser session closed");
        Ok(())
    }
}
