pub mod api;
pub mod rate_limiter;


pub use api::{parse_listing, ListingKind, RedditApiClient};

use async_trait::async_trait;
use feed_core::{CoreError, FeedError, FeedSource, RedditConfig, Submission};

/// Subreddit feed over the public JSON listings.
#[derive(Debug)]
pub struct RedditClient {
    api: RedditApiClient,
    kind: ListingKind,
}

impl RedditClient {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        Ok(Self {
            api: RedditApiClient::new(config)?,
            kind: ListingKind::New,
        })
    }

    pub fn with_listing_kind(mut self, kind: ListingKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn listing_kind(&self) -> ListingKind {
        self.kind
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }

    pub async fn fetch_posts(
        &self,
        subreddit: &str,
        kind: ListingKind,
    ) -> Result<Vec<Submission>, FeedError> {
        self.api.get_subreddit_posts(subreddit, kind).await
    }
}

#[async_trait]
impl FeedSource for RedditClient {
    async fn fetch(&self, subreddit: &str) -> Result<Vec<Submission>, FeedError> {
        self.fetch_posts(subreddit, self.kind).await
    }
}
