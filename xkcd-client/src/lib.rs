use feed_core::{Comic, CoreError, FeedError, XkcdConfig};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Looks up comics in the xkcd archive.
#[derive(Debug, Clone)]
pub struct ComicClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ComicClient {
    pub fn new(config: &XkcdConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("xkcd base url {}: {}", config.base_url, e),
        })?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            timeout,
        })
    }

    /// `<base>/info.0.json` for the latest comic, `<base>/<n>/info.0.json` otherwise.
    pub fn comic_url(&self, number: Option<u32>) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| FeedError::InvalidResponse {
                url: self.base_url.to_string(),
                details: "base url cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty();
            if let Some(n) = number {
                segments.push(&n.to_string());
            }
            segments.push("info.0.json");
        }
        Ok(url)
    }

    /// Fetches comic `number`, or the latest one when `None`.
    pub async fn fetch(&self, number: Option<u32>) -> Result<Comic, FeedError> {
        let url = self.comic_url(number)?;
        let url_str = url.to_string();
        debug!("Fetching comic from {}", url_str);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::RequestTimeout {
                    url: url_str.clone(),
                    seconds: self.timeout.as_secs(),
                }
            } else {
                FeedError::Network {
                    url: url_str.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound { url: url_str });
        }
        if status != StatusCode::OK {
            warn!("Comic request failed with status: {} for {}", status, url_str);
            return Err(FeedError::HttpStatus {
                url: url_str,
                status_code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FeedError::InvalidResponse {
            url: url_str.clone(),
            details: e.to_string(),
        })?;

        let comic = parse_comic(&url_str, &body)?;
        info!("Fetched xkcd #{} ({})", comic.num, comic.safe_title);
        Ok(comic)
    }
}

pub fn parse_comic(url: &str, body: &str) -> Result<Comic, FeedError> {
    serde_json::from_str(body).map_err(|e| FeedError::InvalidResponse {
        url: url.to_string(),
        details: e.to_string(),
    })
}
