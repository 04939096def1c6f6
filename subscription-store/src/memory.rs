use async_trait::async_trait;
use feed_core::{
    normalize_subreddit, ChannelId, CoreError, GuildId, Subscription, SubscriptionError,
    SubscriptionStore, SubscriptionTable,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Subscription table held in process memory.
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    table: RwLock<SubscriptionTable>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: SubscriptionTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn subscribe(&self, guild: GuildId, subscription: Subscription) -> Result<(), CoreError> {
        let mut table = self.table.write().await;
        let entries = table.entry(guild).or_default();

        if entries.iter().any(|existing| existing.same_target(&subscription)) {
            return Err(SubscriptionError::DuplicateSubscription {
                subreddit: subscription.subreddit,
                channel: subscription.channel,
            }
            .into());
        }

        debug!(
            "Guild {} subscribed {} to r/{}",
            guild, subscription.channel, subscription.subreddit
        );
        entries.push(subscription);
        Ok(())
    }

    async fn unsubscribe(
        &self,
        guild: GuildId,
        subreddit: &str,
        channel: ChannelId,
    ) -> Result<Subscription, CoreError> {
        let subreddit = normalize_subreddit(subreddit)?;
        let mut table = self.table.write().await;

        let removed = table.get_mut(&guild).and_then(|entries| {
            let index = entries
                .iter()
                .position(|s| s.subreddit == subreddit && s.channel == channel)?;
            Some(entries.remove(index))
        });
        if table.get(&guild).is_some_and(Vec::is_empty) {
            table.remove(&guild);
        }

        removed.ok_or_else(|| SubscriptionError::SubscriptionNotFound { subreddit, channel }.into())
    }

    async fn guild_subscriptions(&self, guild: GuildId) -> Result<Vec<Subscription>, CoreError> {
        Ok(self
            .table
            .read()
            .await
            .get(&guild)
            .cloned()
            .unwrap_or_default())
    }

    async fn all_subscriptions(&self) -> Result<SubscriptionTable, CoreError> {
        Ok(self.table.read().await.clone())
    }
}
