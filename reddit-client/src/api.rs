use crate::rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
use chrono::{DateTime, Utc};
use feed_core::{CoreError, ErrorExt, FeedError, RedditConfig, Submission};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Which listing of a subreddit to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingKind {
    #[default]
    New,
    Hot,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::New => "new",
            ListingKind::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub created_utc: f64,
    pub permalink: Option<String>,
    pub link_flair_text: Option<String>,
    pub preview: Option<RedditPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPreview {
    #[serde(default)]
    pub images: Vec<RedditPreviewImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPreviewImage {
    pub source: RedditImageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditImageSource {
    pub url: String,
}

impl RedditPostData {
    fn into_submission(self) -> Result<Submission, String> {
        if !self.created_utc.is_finite() {
            return Err(format!("created_utc {} is not a timestamp", self.created_utc));
        }
        let timestamp = DateTime::<Utc>::from_timestamp(self.created_utc as i64, 0)
            .ok_or_else(|| format!("created_utc {} is out of range", self.created_utc))?;

        // Reddit HTML-escapes preview URLs
        let preview = self
            .preview
            .and_then(|p| p.images.into_iter().next())
            .map(|image| image.source.url.replace("&amp;", "&"));

        let flair = self
            .link_flair_text
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        let permalink = self
            .permalink
            .map(|p| format!("https://www.reddit.com{}", p));

        Ok(Submission {
            id: self.id,
            title: self.title,
            text: self.selftext,
            author: self.author,
            subreddit: self.subreddit,
            timestamp,
            preview,
            flair,
            permalink,
        })
    }
}

/// Parses a listing body into submissions, newest first.
///
/// Entries that fail to parse are logged and skipped. A body that is not a
/// listing at all is an `InvalidResponse`; a listing without children is an
/// `EmptyListing`.
pub fn parse_listing(subreddit: &str, url: &str, body: &str) -> Result<Vec<Submission>, FeedError> {
    let listing: RedditListing<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| FeedError::InvalidResponse {
            url: url.to_string(),
            details: e.to_string(),
        })?;

    if listing.data.children.is_empty() {
        return Err(FeedError::EmptyListing {
            subreddit: subreddit.to_string(),
        });
    }

    let total = listing.data.children.len();
    let mut submissions = Vec::with_capacity(total);

    for (index, child) in listing.data.children.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RedditListingChild<RedditPostData>>(child)
            .map_err(|e| e.to_string())
            .and_then(|child| child.data.into_submission());

        match parsed {
            Ok(submission) => submissions.push(submission),
            Err(details) => {
                FeedError::MalformedEntry {
                    subreddit: subreddit.to_string(),
                    index,
                    details,
                }
                .log_warn();
            }
        }
    }

    debug!(
        "Parsed {}/{} entries from r/{}",
        submissions.len(),
        total,
        subreddit
    );
    Ok(submissions)
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: Url,
    user_agent: String,
    timeout: Duration,
    listing_limit: Option<u32>,
}

impl RedditApiClient {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("reddit base url {}: {}", config.base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::from_reddit_config(
                config,
            ))),
            base_url,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            listing_limit: config.listing_limit,
        })
    }

    /// `<base>/r/<subreddit>/<kind>.json`
    pub fn listing_url(&self, subreddit: &str, kind: ListingKind) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        let file = format!("{}.json", kind.as_str());
        url.path_segments_mut()
            .map_err(|_| FeedError::InvalidResponse {
                url: self.base_url.to_string(),
                details: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["r", subreddit, file.as_str()]);

        if let Some(limit) = self.listing_limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }

        Ok(url)
    }

    pub async fn get_subreddit_posts(
        &self,
        subreddit: &str,
        kind: ListingKind,
    ) -> Result<Vec<Submission>, FeedError> {
        let url = self.listing_url(subreddit, kind)?;
        let url_str = url.to_string();
        let start_time = Instant::now();

        let permit = self
            .rate_limiter
            .acquire_permit()
            .await
            .map_err(|e| FeedError::Network {
                url: url_str.clone(),
                reason: e.to_string(),
            })?;
        debug!(
            "Acquired rate limit permit for {} after {:?}",
            url_str, permit.queue_wait_time
        );

        info!("Fetching r/{} {} listing", subreddit, kind.as_str());
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for {}: {}", url_str, e);
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
        if status != StatusCode::OK {
            warn!("Request failed with status: {} for {}", status, url_str);
            return Err(FeedError::HttpStatus {
                url: url_str,
                status_code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::RequestTimeout {
                    url: url_str.clone(),
                    seconds: self.timeout.as_secs(),
                }
            } else {
                FeedError::InvalidResponse {
                    url: url_str.clone(),
                    details: e.to_string(),
                }
            }
        })?;
        drop(permit);

        let submissions = parse_listing(subreddit, &url_str, &body)?;
        info!(
            "Retrieved {} posts from r/{} in {:?}",
            submissions.len(),
            subreddit,
            start_time.elapsed()
        );
        Ok(submissions)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(base_url: &str, limit: Option<u32>) -> RedditApiClient {
        let config = RedditConfig {
            base_url: base_url.to_string(),
            listing_limit: limit,
            ..RedditConfig::default()
        };
        RedditApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_api_client_creation() {
        let client = client_with("https://www.reddit.com", None);
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert!(client.user_agent().starts_with("Mozilla/5.0"));

        let status = client.get_rate_limit_status().await;
        assert!(status.available_tokens > 0);
    }

    #[test]
    fn test_listing_urls() {
        let client = client_with("https://www.reddit.com", None);
        assert_eq!(
            client.listing_url("news", ListingKind::New).unwrap().as_str(),
            "https://www.reddit.com/r/news/new.json"
        );
        assert_eq!(
            client.listing_url("rust", ListingKind::Hot).unwrap().as_str(),
            "https://www.reddit.com/r/rust/hot.json"
        );
    }

    #[test]
    fn test_listing_url_with_limit_and_trailing_slash() {
        let client = client_with("http://localhost:8080/", Some(50));
        assert_eq!(
            client.listing_url("news", ListingKind::New).unwrap().as_str(),
            "http://localhost:8080/r/news/new.json?limit=50"
        );
    }

    #[test]
    fn test_post_conversion() {
        let post_data = RedditPostData {
            id: "test123".to_string(),
            title: "Test Post".to_string(),
            selftext: "This is test content".to_string(),
            author: "test_user".to_string(),
            subreddit: "test".to_string(),
            created_utc: 1640995200.0,
            permalink: Some("/r/test/comments/test123/test_post/".to_string()),
            link_flair_text: Some(" AMA ".to_string()),
            preview: Some(RedditPreview {
                images: vec![RedditPreviewImage {
                    source: RedditImageSource {
                        url: "https://preview.redd.it/a.jpg?width=640&amp;s=abc".to_string(),
                    },
                }],
            }),
        };

        let submission = post_data.into_submission().unwrap();
        assert_eq!(submission.id, "test123");
        assert_eq!(submission.text, "This is test content");
        assert_eq!(submission.timestamp.timestamp(), 1640995200);
        assert_eq!(submission.flair.as_deref(), Some("AMA"));
        assert_eq!(
            submission.preview.as_deref(),
            Some("https://preview.redd.it/a.jpg?width=640&s=abc")
        );
        assert_eq!(
            submission.permalink.as_deref(),
            Some("https://www.reddit.com/r/test/comments/test123/test_post/")
        );
    }

    #[test]
    fn test_out_of_range_timestamp_is_rejected() {
        let post_data = RedditPostData {
            id: "bad".to_string(),
            title: "Bad".to_string(),
            selftext: String::new(),
            author: "x".to_string(),
            subreddit: "test".to_string(),
            created_utc: f64::MAX,
            permalink: None,
            link_flair_text: None,
            preview: None,
        };
        assert!(post_data.into_submission().is_err());
    }
}
