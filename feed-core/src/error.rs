use crate::types::ChannelId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while fetching and parsing a remote listing or comic.
///
/// `RequestTimeout`, `Network`, `HttpStatus` and `InvalidResponse` are the
/// fetch failures; together with `EmptyListing` they mean "no new data this
/// cycle" to the poller.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("Request to {url} timed out after {seconds} seconds")]
    RequestTimeout { url: String, seconds: u64 },

    #[error("Network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Unexpected HTTP status {status_code} from {url}")]
    HttpStatus { url: String, status_code: u16 },

    #[error("Invalid response from {url}: {details}")]
    InvalidResponse { url: String, details: String },

    #[error("Listing for r/{subreddit} returned no posts")]
    EmptyListing { subreddit: String },

    #[error("Malformed listing entry #{index} in r/{subreddit}: {details}")]
    MalformedEntry {
        subreddit: String,
        index: usize,
        details: String,
    },

    #[error("Resource not found: {url}")]
    NotFound { url: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("r/{subreddit} is already subscribed in channel {channel}")]
    DuplicateSubscription {
        subreddit: String,
        channel: ChannelId,
    },

    #[error("No subscription for r/{subreddit} in channel {channel}")]
    SubscriptionNotFound {
        subreddit: String,
        channel: ChannelId,
    },

    #[error("Invalid subreddit name: {name}")]
    InvalidSubreddit { name: String },

    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("Invalid channel: {value}")]
    InvalidChannel { value: String },
}

#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("Channel {channel} is unreachable: {reason}")]
    DestinationUnreachable { channel: ChannelId, reason: String },

    #[error("Sending to channel {channel} timed out after {seconds} seconds")]
    SendTimeout { channel: ChannelId, seconds: u64 },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Query execution failed: {query}")]
    QueryFailed { query: String },

    #[error("Corrupt subscription row: {details}")]
    CorruptRow { details: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
