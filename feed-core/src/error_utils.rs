use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// True when the same operation may succeed on the next poll cycle.
    fn is_transient(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Feed(e) => {
                error!("Feed error details: {:?}", e);
            }
            CoreError::Store(e) => {
                error!("Store error details: {:?}", e);
            }
            CoreError::Delivery(e) => {
                error!("Delivery error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        match self {
            CoreError::Feed(e) => e.is_transient(),
            CoreError::Store(e) => e.is_transient(),
            CoreError::Delivery(e) => e.is_transient(),
            CoreError::Subscription(e) => e.is_transient(),
            CoreError::Network(_) => true,
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Feed(e) => e.user_friendly_message(),
            CoreError::Subscription(e) => e.user_friendly_message(),
            CoreError::Store(e) => e.user_friendly_message(),
            CoreError::Delivery(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please try again later.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Feed(_) => "FEED".to_string(),
            CoreError::Subscription(_) => "SUBSCRIPTION".to_string(),
            CoreError::Store(_) => "STORE".to_string(),
            CoreError::Delivery(_) => "DELIVERY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for FeedError {
    fn log_error(&self) -> &Self {
        error!("FeedError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FeedError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        match self {
            FeedError::RequestTimeout { .. } => true,
            FeedError::Network { .. } => true,
            FeedError::HttpStatus { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            FeedError::InvalidResponse { .. } => true,
            FeedError::EmptyListing { .. } => true,
            FeedError::MalformedEntry { .. } => false,
            FeedError::NotFound { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FeedError::RequestTimeout { .. } => {
                "The remote site took too long to answer. Please try again.".to_string()
            }
            FeedError::NotFound { .. } => "Comic not found".to_string(),
            FeedError::HttpStatus { status_code: 404, .. } => {
                "The requested resource could not be found.".to_string()
            }
            FeedError::EmptyListing { subreddit } => {
                format!("r/{} has no posts right now.", subreddit)
            }
            _ => "The remote site returned an unexpected response. Please try again later."
                .to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            FeedError::RequestTimeout { .. } => "FEED_TIMEOUT".to_string(),
            FeedError::Network { .. } => "FEED_NETWORK".to_string(),
            FeedError::HttpStatus { .. } => "FEED_HTTP_STATUS".to_string(),
            FeedError::InvalidResponse { .. } => "FEED_INVALID_RESPONSE".to_string(),
            FeedError::EmptyListing { .. } => "FEED_EMPTY_LISTING".to_string(),
            FeedError::MalformedEntry { .. } => "FEED_MALFORMED_ENTRY".to_string(),
            FeedError::NotFound { .. } => "FEED_NOT_FOUND".to_string(),
        }
    }
}

impl ErrorExt for SubscriptionError {
    fn log_error(&self) -> &Self {
        error!("SubscriptionError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SubscriptionError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SubscriptionError::DuplicateSubscription { .. } => {
                "That channel is already subscribed to that subreddit".to_string()
            }
            SubscriptionError::SubscriptionNotFound { .. } => {
                "There is no active feed for that subreddit".to_string()
            }
            SubscriptionError::InvalidSubreddit { name } => {
                format!("'{}' is not a valid subreddit name.", name)
            }
            SubscriptionError::InvalidFilter { reason } => format!("Invalid filter: {}.", reason),
            SubscriptionError::InvalidChannel { value } => {
                format!("'{}' is not a channel. Mention it like #channel.", value)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            SubscriptionError::DuplicateSubscription { .. } => "FEED_EXISTS".to_string(),
            SubscriptionError::SubscriptionNotFound { .. } => "FEED_NOT_FOUND".to_string(),
            SubscriptionError::InvalidSubreddit { .. } => "INVALID_SUBREDDIT".to_string(),
            SubscriptionError::InvalidFilter { .. } => "INVALID_FILTER".to_string(),
            SubscriptionError::InvalidChannel { .. } => "INVALID_CHANNEL".to_string(),
        }
    }
}

impl ErrorExt for DeliveryError {
    fn log_error(&self) -> &Self {
        error!("DeliveryError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DeliveryError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::SendTimeout { .. })
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DeliveryError::DestinationUnreachable { channel, .. } => format!(
                "Could not post to <#{}>. Check that the channel exists and the bot can write to it.",
                channel
            ),
            DeliveryError::SendTimeout { .. } => {
                "Posting to the channel timed out. Please try again.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            DeliveryError::DestinationUnreachable { .. } => {
                "DELIVERY_DESTINATION_UNREACHABLE".to_string()
            }
            DeliveryError::SendTimeout { .. } => "DELIVERY_TIMEOUT".to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn log_error(&self) -> &Self {
        error!("StoreError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StoreError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed { .. } | StoreError::Sql(sqlx::Error::PoolTimedOut)
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StoreError::ConnectionFailed { .. } => {
                "Subscription storage is unavailable. Please try again.".to_string()
            }
            StoreError::CorruptRow { .. } => {
                "Stored subscriptions appear to be corrupted.".to_string()
            }
            _ => "Subscription storage error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StoreError::ConnectionFailed { .. } => "STORE_CONNECTION_FAILED".to_string(),
            StoreError::MigrationFailed { .. } => "STORE_MIGRATION_FAILED".to_string(),
            StoreError::QueryFailed { .. } => "STORE_QUERY_FAILED".to_string(),
            StoreError::CorruptRow { .. } => "STORE_CORRUPT_ROW".to_string(),
            StoreError::Sql(_) => "STORE_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_transient() {
                info!("Error is transient, the next poll cycle will try again");
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
