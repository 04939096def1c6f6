use crate::error::{CoreError, DeliveryError, FeedError};
use crate::types::{ChannelId, GuildId, Submission, Subscription, SubscriptionTable};
use async_trait::async_trait;

/// Source of subreddit posts.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Newest posts of `subreddit`, newest first.
    async fn fetch(&self, subreddit: &str) -> Result<Vec<Submission>, FeedError>;
}

/// Per-guild subscription persistence.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fails with `SubscriptionError::DuplicateSubscription` when the guild
    /// already has the same (subreddit, channel) pair.
    async fn subscribe(&self, guild: GuildId, subscription: Subscription)
        -> Result<(), CoreError>;

    /// Removes and returns the matching subscription, or fails with
    /// `SubscriptionError::SubscriptionNotFound` without touching the table.
    async fn unsubscribe(
        &self,
        guild: GuildId,
        subreddit: &str,
        channel: ChannelId,
    ) -> Result<Subscription, CoreError>;

    async fn guild_subscriptions(&self, guild: GuildId) -> Result<Vec<Subscription>, CoreError>;

    async fn all_subscriptions(&self) -> Result<SubscriptionTable, CoreError>;
}

/// Outbound message delivery to a chat channel.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    async fn send_submission(
        &self,
        channel: ChannelId,
        submission: &Submission,
    ) -> Result<(), DeliveryError>;
}
