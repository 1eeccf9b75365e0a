//! Remote feed access.
//!
//! The pipeline only depends on the [`FetchPage`] trait, which turns a page
//! number and page size into an ordered batch of [`FeedItem`]s. The
//! production implementation, [`FeedClient`], issues one HTTP GET per page
//! against the paginated news endpoint.
//!
//! # Request Shape
//!
//! ```text
//! GET {base_url}?page=2&page_size=50&location=msk&text_format=text
//!     &expand=place&fields=id,title,place,...,publication_date
//! ```
//!
//! Any transport failure, non-200 status or body that does not decode as a
//! [`FeedPage`] is reported as a [`FetchError`] for that page only. There are
//! no retries at this layer.

use crate::config::FeedSettings;
use crate::models::{FeedItem, FeedPage};
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fields requested from the feed for every entry.
pub const FEED_FIELDS: &str =
    "id,title,place,description,site_url,favorites_count,comments_count,publication_date";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Failure to fetch or decode one page of the feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed responded with {status}: {body_preview}")]
    Status {
        status: StatusCode,
        body_preview: String,
    },

    #[error("response body is not a feed page: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Capability to fetch one page of the feed.
///
/// Implementors must be shareable across worker tasks, and the returned
/// future must be `Send` so workers can run on a multi-threaded runtime.
pub trait FetchPage: Send + Sync + 'static {
    /// Fetch page `page` (1-based) holding at most `page_size` entries.
    ///
    /// Entries are returned in feed order.
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<FeedItem>, FetchError>> + Send;
}

/// HTTP client for the paginated news endpoint.
///
/// Holds a single connection-pooling [`reqwest::Client`] shared by every
/// worker.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    base_url: Url,
    location: String,
}

impl FeedClient {
    /// Build a client from the feed settings.
    ///
    /// # Errors
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be
    /// constructed (for example when the TLS backend fails to initialize).
    pub fn new(settings: &FeedSettings) -> Result<Self, Box<dyn std::error::Error>> {
        let base_url = Url::parse(&settings.base_url)?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            location: settings.location.clone(),
        })
    }

    /// Full request URL for one page, including every query parameter.
    pub fn page_url(&self, page: u32, page_size: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string())
            .append_pair("location", &self.location)
            .append_pair("text_format", "text")
            .append_pair("expand", "place")
            .append_pair("fields", FEED_FIELDS);
        url
    }
}

impl FetchPage for FeedClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<FeedItem>, FetchError> {
        let url = self.page_url(page, page_size);
        debug!(%url, "Requesting feed page");

        let t0 = Instant::now();
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status,
                body_preview: truncate_for_log(&body, 200),
            });
        }

        let feed_page: FeedPage = serde_json::from_str(&body).inspect_err(|e| {
            warn!(
                error = %e,
                body_preview = %truncate_for_log(&body, 300),
                "Feed page did not decode"
            );
        })?;

        info!(
            items = feed_page.results.len(),
            total = ?feed_page.count,
            has_next = feed_page.next.is_some(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Received feed page"
        );
        Ok(feed_page.results)
    }
}
